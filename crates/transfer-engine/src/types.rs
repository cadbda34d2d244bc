use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sentinel mint reference used for the native currency holding.
pub const NATIVE_MINT_REFERENCE: &str = "native";

/// Solana clusters the engine knows a token registry for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    MainnetBeta,
    #[default]
    Devnet,
    Testnet,
}

impl Cluster {
    pub fn slug(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
        }
    }
}

/// What a holding is denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "mint")]
pub enum MintRef {
    Native,
    Token(String),
}

impl MintRef {
    pub fn as_str(&self) -> &str {
        match self {
            MintRef::Native => NATIVE_MINT_REFERENCE,
            MintRef::Token(mint) => mint,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, MintRef::Native)
    }
}

impl fmt::Display for MintRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a wallet's holdings list. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenHolding {
    mint: MintRef,
    balance: Decimal,
    decimals: u32,
    symbol: String,
    icon_uri: String,
}

impl TokenHolding {
    pub fn new(
        mint: MintRef,
        balance: Decimal,
        decimals: u32,
        symbol: impl Into<String>,
        icon_uri: impl Into<String>,
    ) -> Self {
        Self {
            mint,
            balance,
            decimals,
            symbol: symbol.into(),
            icon_uri: icon_uri.into(),
        }
    }

    pub fn mint(&self) -> &MintRef {
        &self.mint
    }

    /// `"native"` or the mint address.
    pub fn mint_reference(&self) -> &str {
        self.mint.as_str()
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn icon_uri(&self) -> &str {
        &self.icon_uri
    }
}

/// Display metadata for a mint, tagged with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum TokenMetadata {
    Registry { symbol: String, icon_uri: String },
    OnChain { symbol: String, icon_uri: String },
    Fallback { symbol: String },
}

impl TokenMetadata {
    pub fn fallback(mint: &str) -> Self {
        TokenMetadata::Fallback {
            symbol: mint.to_string(),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            TokenMetadata::Registry { symbol, .. }
            | TokenMetadata::OnChain { symbol, .. }
            | TokenMetadata::Fallback { symbol } => symbol,
        }
    }

    pub fn icon_uri(&self) -> &str {
        match self {
            TokenMetadata::Registry { icon_uri, .. } | TokenMetadata::OnChain { icon_uri, .. } => {
                icon_uri
            }
            TokenMetadata::Fallback { .. } => "",
        }
    }
}

/// One submission attempt, as typed by the user.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub recipient_address: String,
    pub amount_text: String,
    pub selected_holding: TokenHolding,
}

impl TransferRequest {
    pub fn new(
        recipient_address: impl Into<String>,
        amount_text: impl Into<String>,
        selected_holding: TokenHolding,
    ) -> Self {
        let recipient_address: String = recipient_address.into();
        let amount_text: String = amount_text.into();
        Self {
            recipient_address: recipient_address.trim().to_string(),
            amount_text: amount_text.trim().to_string(),
            selected_holding,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeState {
    Idle,
    Validating,
    AwaitingAccountDecision,
    Submitted,
    Confirmed,
    Failed,
    Cancelled,
}

impl OutcomeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OutcomeState::Confirmed | OutcomeState::Failed | OutcomeState::Cancelled
        )
    }

    /// Whether a new run may start from this state.
    pub fn accepts_new_run(&self) -> bool {
        *self == OutcomeState::Idle || self.is_terminal()
    }
}

/// User-facing message for every failed run; the cause goes to `diagnostic`.
pub const FAILED_MESSAGE: &str = "Transaction failed!";

/// Prompt shown when the recipient has no account for the selected token.
pub const CREATE_ACCOUNT_PROMPT: &str = "The recipient wallet address does not have an account for this token. Would you like to create it for them?";

/// Snapshot of the orchestrator's progress, published on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionOutcome {
    pub state: OutcomeState,
    pub signature: Option<String>,
    pub message: String,
    #[serde(skip)]
    pub diagnostic: Option<String>,
}

impl TransactionOutcome {
    fn with(state: OutcomeState, signature: Option<String>, message: impl Into<String>) -> Self {
        Self {
            state,
            signature,
            message: message.into(),
            diagnostic: None,
        }
    }

    pub fn idle() -> Self {
        Self::with(OutcomeState::Idle, None, "")
    }

    pub fn validating() -> Self {
        Self::with(OutcomeState::Validating, None, "Validating transfer")
    }

    pub fn awaiting_account_decision() -> Self {
        Self::with(
            OutcomeState::AwaitingAccountDecision,
            None,
            CREATE_ACCOUNT_PROMPT,
        )
    }

    pub fn submitted(signature: &str) -> Self {
        Self::with(
            OutcomeState::Submitted,
            Some(signature.to_string()),
            format!("Transaction sent for ID {signature}!"),
        )
    }

    pub fn confirmed(signature: &str) -> Self {
        Self::with(
            OutcomeState::Confirmed,
            Some(signature.to_string()),
            format!("Transaction confirmed for ID {signature}!"),
        )
    }

    pub fn failed(signature: Option<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: Some(diagnostic.into()),
            ..Self::with(OutcomeState::Failed, signature, FAILED_MESSAGE)
        }
    }

    pub fn cancelled() -> Self {
        Self::with(
            OutcomeState::Cancelled,
            None,
            "Transfer cancelled: recipient token account was not created",
        )
    }
}

impl Default for TransactionOutcome {
    fn default() -> Self {
        Self::idle()
    }
}
