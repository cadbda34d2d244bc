//! Boundaries to the outside world.
//!
//! The engine never talks to the network or to keys directly. Hosts inject
//! a [`Connection`] (RPC), a [`WalletSession`] (address + sign-and-send), a
//! [`ConfirmationPort`] (the one interactive decision) and optionally a
//! [`MetadataFetcher`] for off-chain token metadata.

use async_trait::async_trait;
use chain_sol::SolTransaction;
use serde::{Deserialize, Serialize};

use crate::error::TransferError;

/// `getProgramAccounts` filter, serialized in RPC shape
/// (`{"dataSize":165}`, `{"memcmp":{"offset":32,"bytes":"..."}}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgramAccountFilter {
    DataSize(u64),
    Memcmp { offset: usize, bytes: String },
}

/// An account returned by `getParsedProgramAccounts`; `data` is the
/// JSON-parsed account body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramAccount {
    pub pubkey: String,
    pub data: serde_json::Value,
}

/// A blockhash together with the last block height at which a transaction
/// referencing it can still land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentReference {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// Final word on a broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    /// Landed but the program returned an error.
    Failed(String),
    /// The validity window passed without the transaction landing.
    Expired,
}

#[async_trait]
pub trait Connection: Send + Sync {
    /// Lamport balance of `address`.
    async fn get_balance(&self, address: &str) -> Result<u64, TransferError>;

    async fn get_parsed_program_accounts(
        &self,
        program_id: &str,
        filters: &[ProgramAccountFilter],
    ) -> Result<Vec<ProgramAccount>, TransferError>;

    /// Raw account data, or `None` if the account does not exist.
    async fn get_account_data(&self, address: &str) -> Result<Option<Vec<u8>>, TransferError>;

    async fn get_latest_commitment_reference(&self) -> Result<CommitmentReference, TransferError>;

    /// Wait until `signature` is confirmed, fails, or its reference expires.
    async fn confirm(
        &self,
        signature: &str,
        reference: &CommitmentReference,
    ) -> Result<Confirmation, TransferError>;
}

/// The connected wallet. Key custody lives behind this trait.
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// Current address, or `None` when disconnected.
    fn address(&self) -> Option<String>;

    /// Sign `transaction` and broadcast it, returning its signature.
    async fn sign_and_send(
        &self,
        transaction: &SolTransaction,
        connection: &dyn Connection,
    ) -> Result<String, TransferError>;
}

/// Yes/no decision from whoever drives the session.
#[async_trait]
pub trait ConfirmationPort: Send + Sync {
    async fn ask(&self, prompt: &str) -> bool;
}

/// Non-interactive policy: always agree.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationPort for AutoConfirm {
    async fn ask(&self, prompt: &str) -> bool {
        tracing::debug!(prompt, "auto-confirming");
        true
    }
}

/// Non-interactive policy: always refuse.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoDecline;

#[async_trait]
impl ConfirmationPort for AutoDecline {
    async fn ask(&self, prompt: &str) -> bool {
        tracing::debug!(prompt, "auto-declining");
        false
    }
}

/// Fetches an off-chain metadata document (the JSON behind a metadata URI).
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch_json(&self, uri: &str) -> Result<serde_json::Value, TransferError>;
}
