//! The transfer state machine.
//!
//! ```text
//! Idle -> Validating -> native | token -> Submitted -> Confirmed | Failed
//!                          token -> AwaitingAccountDecision -> token | Cancelled
//! ```
//!
//! Each run is strictly sequential and only one run may be in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chain_sol::{
    address_to_bytes, build_create_associated_token_account,
    build_create_associated_token_account_idempotent, build_spl_transfer, build_system_transfer,
    bytes_to_address, derive_associated_token_address,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::TransferConfig;
use crate::confirmation::{ConfirmationTracker, StepKind};
use crate::error::TransferError;
use crate::ports::{ConfirmationPort, Connection, WalletSession};
use crate::types::{MintRef, TransactionOutcome, TransferRequest, CREATE_ACCOUNT_PROMPT};
use crate::validator::{submission_verdict, validate_request, SubmissionVerdict};

/// Where an associated token account stands on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountResolution {
    Found([u8; 32]),
    /// Not created yet; carries the address it will have.
    NotFound([u8; 32]),
}

/// Clears the in-flight flag when a run ends, however it ends.
///
/// A run abandoned mid-flight (its future dropped) leaves a non-terminal
/// outcome behind; the guard closes it out as `Cancelled` when nothing was
/// broadcast, or `Failed` keeping the last signature when something was.
struct InFlightGuard<'a> {
    in_flight: &'a AtomicBool,
    outcomes: &'a watch::Sender<TransactionOutcome>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.outcomes.send_if_modified(|current| {
            if current.state.accepts_new_run() {
                return false;
            }
            warn!(state = ?current.state, signature = ?current.signature, "transfer abandoned");
            *current = match current.signature.take() {
                Some(signature) => {
                    TransactionOutcome::failed(Some(signature), "run abandoned after broadcast")
                }
                None => TransactionOutcome::cancelled(),
            };
            true
        });
        self.in_flight.store(false, Ordering::Release);
    }
}

pub struct TransactionOrchestrator {
    connection: Arc<dyn Connection>,
    wallet: Arc<dyn WalletSession>,
    confirmations: Arc<dyn ConfirmationPort>,
    config: TransferConfig,
    outcomes: Arc<watch::Sender<TransactionOutcome>>,
    tracker: ConfirmationTracker,
    in_flight: AtomicBool,
}

impl TransactionOrchestrator {
    pub fn new(
        connection: Arc<dyn Connection>,
        wallet: Arc<dyn WalletSession>,
        confirmations: Arc<dyn ConfirmationPort>,
        config: TransferConfig,
    ) -> Self {
        let outcomes = Arc::new(watch::Sender::new(TransactionOutcome::idle()));
        let tracker = ConfirmationTracker::new(connection.clone(), wallet.clone(), outcomes.clone());
        Self {
            connection,
            wallet,
            confirmations,
            config,
            outcomes,
            tracker,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Receiver that sees every outcome transition from now on.
    pub fn subscribe(&self) -> watch::Receiver<TransactionOutcome> {
        self.outcomes.subscribe()
    }

    pub fn outcome(&self) -> TransactionOutcome {
        self.outcomes.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Execute one transfer.
    ///
    /// Errors are returned only when the run never started: another run is
    /// in flight, no wallet is connected, or validation failed (the outcome
    /// goes back to `Idle`). Everything after validation ends in a terminal
    /// outcome returned as `Ok`.
    pub async fn transact(
        &self,
        request: TransferRequest,
    ) -> Result<TransactionOutcome, TransferError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("rejecting transfer while another is in flight");
            return Err(TransferError::OperationInProgress);
        }
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            outcomes: &self.outcomes,
        };

        let sender = self.wallet.address().ok_or(TransferError::WalletNotConnected)?;

        self.publish(TransactionOutcome::validating());
        let minor_units = match self.validate(&request, &sender) {
            Ok(units) => units,
            Err(e) => {
                debug!(error = %e, "transfer request rejected");
                self.publish(TransactionOutcome::idle());
                return Err(e);
            }
        };

        let result = match request.selected_holding.mint() {
            MintRef::Native => {
                self.send_native(&sender, &request.recipient_address, minor_units)
                    .await
            }
            MintRef::Token(mint) => {
                self.send_token(&sender, &request.recipient_address, mint, minor_units)
                    .await
            }
        };

        let outcome = match result {
            Ok(signature) => TransactionOutcome::confirmed(&signature),
            Err(TransferError::UserCancelled) => {
                info!("recipient account creation declined");
                TransactionOutcome::cancelled()
            }
            Err(e) => {
                error!(error = %e, signature = ?e.signature(), "transfer failed");
                TransactionOutcome::failed(e.signature().map(str::to_string), e.to_string())
            }
        };
        self.publish(outcome.clone());
        Ok(outcome)
    }

    /// The same checks `transact` runs, against the connected wallet.
    pub fn verdict(&self, request: &TransferRequest) -> Result<SubmissionVerdict, TransferError> {
        let sender = self.wallet.address().ok_or(TransferError::WalletNotConnected)?;
        Ok(submission_verdict(
            request,
            &sender,
            self.config.native_decimals,
        ))
    }

    fn validate(&self, request: &TransferRequest, sender: &str) -> Result<u64, TransferError> {
        Ok(validate_request(
            request,
            sender,
            self.config.native_decimals,
        )?)
    }

    async fn send_native(
        &self,
        sender: &str,
        recipient: &str,
        lamports: u64,
    ) -> Result<String, TransferError> {
        let from = address_to_bytes(sender)?;
        let to = address_to_bytes(recipient)?;
        let instruction = build_system_transfer(&from, &to, lamports)?;

        info!(recipient, lamports, "sending native transfer");
        self.tracker
            .submit_and_confirm("native transfer", &[instruction], &from, StepKind::Terminal)
            .await
    }

    async fn send_token(
        &self,
        sender: &str,
        recipient: &str,
        mint: &str,
        amount: u64,
    ) -> Result<String, TransferError> {
        let owner = address_to_bytes(sender)?;
        let recipient = address_to_bytes(recipient)?;
        let mint = address_to_bytes(mint)?;
        let mut instructions = Vec::with_capacity(2);

        let source = match self.resolve_token_account(&owner, &mint).await? {
            AccountResolution::Found(address) => address,
            AccountResolution::NotFound(address) => {
                info!(account = %bytes_to_address(&address), "sender token account missing, creating it");
                instructions.push(build_create_associated_token_account_idempotent(
                    &owner, &owner, &mint,
                )?);
                address
            }
        };

        let destination = match self.resolve_token_account(&recipient, &mint).await? {
            AccountResolution::Found(address) => address,
            AccountResolution::NotFound(address) => {
                self.create_recipient_account(&owner, &recipient, &mint, &address)
                    .await?
            }
        };

        instructions.push(build_spl_transfer(&source, &destination, &owner, amount)?);
        info!(
            destination = %bytes_to_address(&destination),
            amount,
            "sending token transfer"
        );
        self.tracker
            .submit_and_confirm("token transfer", &instructions, &owner, StepKind::Terminal)
            .await
    }

    /// Ask before paying for the recipient's account; on yes, create it and
    /// wait for it to land.
    async fn create_recipient_account(
        &self,
        payer: &[u8; 32],
        recipient: &[u8; 32],
        mint: &[u8; 32],
        expected: &[u8; 32],
    ) -> Result<[u8; 32], TransferError> {
        self.publish(TransactionOutcome::awaiting_account_decision());
        if !self.confirmations.ask(CREATE_ACCOUNT_PROMPT).await {
            return Err(TransferError::UserCancelled);
        }

        let create = build_create_associated_token_account(payer, recipient, mint)?;
        self.tracker
            .submit_and_confirm(
                "create recipient account",
                &[create],
                payer,
                StepKind::Intermediate,
            )
            .await?;

        match self.resolve_token_account(recipient, mint).await? {
            AccountResolution::Found(address) => Ok(address),
            AccountResolution::NotFound(_) => {
                warn!(account = %bytes_to_address(expected), "created account not visible yet");
                Err(TransferError::AccountNotFound(bytes_to_address(expected)))
            }
        }
    }

    /// Derive `owner`'s associated account for `mint` and check it exists.
    pub async fn resolve_token_account(
        &self,
        owner: &[u8; 32],
        mint: &[u8; 32],
    ) -> Result<AccountResolution, TransferError> {
        let address = derive_associated_token_address(owner, mint)?;
        let resolution = match self
            .connection
            .get_account_data(&bytes_to_address(&address))
            .await?
        {
            Some(_) => AccountResolution::Found(address),
            None => AccountResolution::NotFound(address),
        };
        debug!(account = %bytes_to_address(&address), ?resolution, "resolved token account");
        Ok(resolution)
    }

    /// Publish `outcome` unless it is already the current snapshot.
    fn publish(&self, outcome: TransactionOutcome) {
        self.outcomes.send_if_modified(|current| {
            if *current == outcome {
                return false;
            }
            *current = outcome;
            true
        });
    }
}
