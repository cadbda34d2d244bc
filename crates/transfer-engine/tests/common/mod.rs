//! In-memory ports shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chain_sol::{
    bytes_to_address, serialize_message, SolTransaction, ASSOCIATED_TOKEN_PROGRAM_ID,
    TOKEN_ACCOUNT_LEN,
};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use parking_lot::{Mutex, MutexGuard};
use rand::rngs::OsRng;
use serde_json::{json, Value};
use tokio::sync::Notify;
use transfer_engine::{
    CommitmentReference, Confirmation, ConfirmationPort, Connection, MetadataFetcher,
    ProgramAccount, ProgramAccountFilter, TransferError, WalletSession,
};

pub const DEVNET_USDC: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

/// Two-sided rendezvous: the mock signals `entered`, then waits for `release`.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct ChainState {
    pub balances: HashMap<String, u64>,
    pub token_accounts: Vec<ProgramAccount>,
    pub listing_error: Option<String>,
    pub accounts: HashMap<String, Vec<u8>>,
    pub account_lookup_error: Option<String>,
    /// Popped per `confirm` call; empty means `Confirmed`.
    pub confirmations: VecDeque<Confirmation>,
    pub last_filters: Vec<ProgramAccountFilter>,
    pub listing_calls: usize,
    pub confirm_calls: Vec<String>,
}

#[derive(Default)]
pub struct MockConnection {
    state: Mutex<ChainState>,
    balance_gate: Mutex<Option<Arc<Gate>>>,
    confirm_gate: Mutex<Option<Arc<Gate>>>,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock()
    }

    /// Make the next `get_balance` calls wait on the returned gate.
    pub fn gate_balance(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.balance_gate.lock() = Some(gate.clone());
        gate
    }

    /// Make the next `confirm` calls wait on the returned gate.
    pub fn gate_confirm(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.confirm_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn create_account(&self, address: &str) {
        self.state()
            .accounts
            .insert(address.to_string(), vec![0; TOKEN_ACCOUNT_LEN as usize]);
    }

    pub fn has_account(&self, address: &str) -> bool {
        self.state().accounts.contains_key(address)
    }

    pub fn add_token_account(&self, pubkey: &str, mint: &str, amount: u64, decimals: u32) {
        self.state()
            .token_accounts
            .push(token_account(pubkey, mint, amount, decimals));
    }
}

pub fn token_account(pubkey: &str, mint: &str, amount: u64, decimals: u32) -> ProgramAccount {
    ProgramAccount {
        pubkey: pubkey.to_string(),
        data: json!({
            "program": "spl-token",
            "parsed": {
                "type": "account",
                "info": {
                    "mint": mint,
                    "tokenAmount": {
                        "amount": amount.to_string(),
                        "decimals": decimals,
                    }
                }
            },
            "space": 165
        }),
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn get_balance(&self, address: &str) -> Result<u64, TransferError> {
        let gate = self.balance_gate.lock().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(self.state().balances.get(address).copied().unwrap_or(0))
    }

    async fn get_parsed_program_accounts(
        &self,
        _program_id: &str,
        filters: &[ProgramAccountFilter],
    ) -> Result<Vec<ProgramAccount>, TransferError> {
        let mut state = self.state();
        state.listing_calls += 1;
        state.last_filters = filters.to_vec();
        if let Some(reason) = &state.listing_error {
            return Err(TransferError::Network(reason.clone()));
        }
        Ok(state.token_accounts.clone())
    }

    async fn get_account_data(&self, address: &str) -> Result<Option<Vec<u8>>, TransferError> {
        let state = self.state();
        if let Some(reason) = &state.account_lookup_error {
            return Err(TransferError::Network(reason.clone()));
        }
        Ok(state.accounts.get(address).cloned())
    }

    async fn get_latest_commitment_reference(&self) -> Result<CommitmentReference, TransferError> {
        Ok(CommitmentReference {
            blockhash: bytes_to_address(&[9u8; 32]),
            last_valid_block_height: 1_000,
        })
    }

    async fn confirm(
        &self,
        signature: &str,
        _reference: &CommitmentReference,
    ) -> Result<Confirmation, TransferError> {
        let gate = self.confirm_gate.lock().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let mut state = self.state();
        state.confirm_calls.push(signature.to_string());
        Ok(state
            .confirmations
            .pop_front()
            .unwrap_or(Confirmation::Confirmed))
    }
}

/// Signs with a real ed25519 key, records every transaction and lets
/// associated-token-account creations take effect on the mock chain.
pub struct MockWallet {
    key: SigningKey,
    chain: Arc<MockConnection>,
    address: Mutex<Option<String>>,
    sent: Mutex<Vec<SolTransaction>>,
    signatures: Mutex<Vec<String>>,
    signing_error: Mutex<Option<String>>,
}

impl MockWallet {
    pub fn new(chain: Arc<MockConnection>) -> Arc<Self> {
        let key = SigningKey::generate(&mut OsRng);
        let address = bytes_to_address(&key.verifying_key().to_bytes());
        Arc::new(Self {
            key,
            chain,
            address: Mutex::new(Some(address)),
            sent: Mutex::new(Vec::new()),
            signatures: Mutex::new(Vec::new()),
            signing_error: Mutex::new(None),
        })
    }

    pub fn pubkey(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    pub fn owner(&self) -> String {
        bytes_to_address(&self.pubkey())
    }

    pub fn disconnect(&self) {
        *self.address.lock() = None;
    }

    pub fn switch_to(&self, address: &str) {
        *self.address.lock() = Some(address.to_string());
    }

    pub fn fail_signing(&self, reason: &str) {
        *self.signing_error.lock() = Some(reason.to_string());
    }

    pub fn sent(&self) -> Vec<SolTransaction> {
        self.sent.lock().clone()
    }

    /// Signatures handed back to the engine, in send order.
    pub fn signatures(&self) -> Vec<String> {
        self.signatures.lock().clone()
    }
}

#[async_trait]
impl WalletSession for MockWallet {
    fn address(&self) -> Option<String> {
        self.address.lock().clone()
    }

    async fn sign_and_send(
        &self,
        transaction: &SolTransaction,
        _connection: &dyn Connection,
    ) -> Result<String, TransferError> {
        if let Some(reason) = self.signing_error.lock().clone() {
            return Err(TransferError::Signing(reason));
        }

        let message = serialize_message(transaction)?;
        let signature = self.key.sign(&message);

        for ix in &transaction.compiled_instructions {
            if transaction.program_of(ix) == Some(&ASSOCIATED_TOKEN_PROGRAM_ID) {
                if let Some(ata) = transaction.account_of(ix, 1) {
                    self.chain.create_account(&bytes_to_address(ata));
                }
            }
        }

        let signature = bs58::encode(signature.to_bytes()).into_string();
        self.sent.lock().push(transaction.clone());
        self.signatures.lock().push(signature.clone());
        Ok(signature)
    }
}

/// Answers every prompt the same way and records what was asked.
pub struct ScriptedPort {
    answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedPort {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ConfirmationPort for ScriptedPort {
    async fn ask(&self, prompt: &str) -> bool {
        self.prompts.lock().push(prompt.to_string());
        self.answer
    }
}

/// Holds the decision until the test releases the gate.
pub struct GatedPort {
    pub gate: Gate,
    answer: bool,
}

impl GatedPort {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            gate: Gate::default(),
            answer,
        })
    }
}

#[async_trait]
impl ConfirmationPort for GatedPort {
    async fn ask(&self, _prompt: &str) -> bool {
        self.gate.entered.notify_one();
        self.gate.release.notified().await;
        self.answer
    }
}

/// Serves canned metadata documents; unknown URIs are unreachable.
#[derive(Default)]
pub struct MockFetcher {
    documents: Mutex<HashMap<String, Value>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, uri: &str, document: Value) {
        self.documents.lock().insert(uri.to_string(), document);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for MockFetcher {
    async fn fetch_json(&self, uri: &str) -> Result<Value, TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .get(uri)
            .cloned()
            .ok_or_else(|| TransferError::Metadata(format!("unreachable: {uri}")))
    }
}

/// A `MetadataV1` account head with the given symbol and uri.
pub fn metadata_account(mint: &[u8; 32], symbol: &str, uri: &str) -> Vec<u8> {
    fn field(text: &str, width: usize) -> Vec<u8> {
        let mut out = (width as u32).to_le_bytes().to_vec();
        let mut body = text.as_bytes().to_vec();
        body.resize(width, 0);
        out.extend(body);
        out
    }

    let mut data = vec![4u8];
    data.extend([1u8; 32]);
    data.extend(mint);
    data.extend(field("Some Token", 32));
    data.extend(field(symbol, 10));
    data.extend(field(uri, 200));
    data
}

/// A fresh, valid address that nobody owns.
pub fn random_address() -> String {
    bytes_to_address(&SigningKey::generate(&mut OsRng).verifying_key().to_bytes())
}
