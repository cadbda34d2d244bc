//! Transfer orchestration for Solana wallets.
//!
//! Discovers a wallet's native and SPL token holdings, validates a transfer
//! request, and drives it on-chain: native transfers directly, token
//! transfers through associated token accounts, asking first when the
//! recipient's account has to be created. Network access, keys and the
//! interactive decision are injected through the traits in [`ports`].

pub mod config;
pub mod confirmation;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod orchestrator;
pub mod ports;
pub mod registry;
pub mod session;
pub mod types;
pub mod validator;

pub use config::TransferConfig;
pub use confirmation::{ConfirmationTracker, StepKind};
pub use discovery::{AccountDiscovery, DiscoveryReport, Portfolio};
pub use error::{TransferError, ValidationError};
pub use logging::{init_logging, LogFormat};
pub use metadata::{HttpMetadataFetcher, TokenMetadataResolver};
pub use orchestrator::{AccountResolution, TransactionOrchestrator};
pub use ports::{
    AutoConfirm, AutoDecline, CommitmentReference, Confirmation, ConfirmationPort, Connection,
    MetadataFetcher, ProgramAccount, ProgramAccountFilter, WalletSession,
};
pub use registry::{KnownToken, TokenRegistry};
pub use session::TransferSession;
pub use types::{
    Cluster, MintRef, OutcomeState, TokenHolding, TokenMetadata, TransactionOutcome,
    TransferRequest,
};
pub use validator::{submission_verdict, SubmissionVerdict};
