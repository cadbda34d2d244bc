use chain_sol::SolError;
use thiserror::Error;

/// Why a transfer request may not be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid wallet address")]
    InvalidAddress,

    #[error("Cannot send to the same wallet")]
    SelfTransfer,

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Amount exceeds balance")]
    InsufficientBalance,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Token account not found: {0}")]
    AccountNotFound(String),

    #[error("Cancelled by user")]
    UserCancelled,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Confirmation expired for {signature}")]
    ConfirmationTimeout { signature: String },

    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    #[error("Another transfer is in progress")]
    OperationInProgress,

    #[error("Metadata unavailable: {0}")]
    Metadata(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("SOL: {0}")]
    Chain(#[from] SolError),
}

impl TransferError {
    /// Signature of the broadcast transaction this error refers to, if any.
    pub fn signature(&self) -> Option<&str> {
        match self {
            TransferError::ConfirmationTimeout { signature }
            | TransferError::TransactionFailed { signature, .. } => Some(signature),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(e: reqwest::Error) -> Self {
        TransferError::Metadata(e.to_string())
    }
}

impl From<serde_json::Error> for TransferError {
    fn from(e: serde_json::Error) -> Self {
        TransferError::Config(e.to_string())
    }
}
