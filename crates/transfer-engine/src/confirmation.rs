//! Submit one transaction and follow it to finality.

use std::sync::Arc;

use chain_sol::{address_to_bytes, compile_transaction, SolInstruction};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::TransferError;
use crate::ports::{Confirmation, Connection, WalletSession};
use crate::types::TransactionOutcome;

/// Whether a confirmed step ends the run or another step follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Intermediate,
    Terminal,
}

pub struct ConfirmationTracker {
    connection: Arc<dyn Connection>,
    wallet: Arc<dyn WalletSession>,
    outcomes: Arc<watch::Sender<TransactionOutcome>>,
}

impl ConfirmationTracker {
    pub fn new(
        connection: Arc<dyn Connection>,
        wallet: Arc<dyn WalletSession>,
        outcomes: Arc<watch::Sender<TransactionOutcome>>,
    ) -> Self {
        Self {
            connection,
            wallet,
            outcomes,
        }
    }

    /// Compile, sign, send and confirm `instructions` as one transaction.
    ///
    /// `Submitted` is published as soon as the wallet returns a signature.
    /// `Confirmed` is published only for [`StepKind::Terminal`]. On failure
    /// or expiry the error carries the signature; publishing `Failed` is
    /// left to the caller. Never resubmits.
    pub async fn submit_and_confirm(
        &self,
        step: &str,
        instructions: &[SolInstruction],
        fee_payer: &[u8; 32],
        kind: StepKind,
    ) -> Result<String, TransferError> {
        let reference = self.connection.get_latest_commitment_reference().await?;
        let blockhash = address_to_bytes(&reference.blockhash)?;
        let transaction = compile_transaction(instructions, fee_payer, &blockhash)?;

        let signature = self
            .wallet
            .sign_and_send(&transaction, self.connection.as_ref())
            .await?;
        info!(step, %signature, valid_until = reference.last_valid_block_height, "transaction submitted");
        self.outcomes
            .send_replace(TransactionOutcome::submitted(&signature));

        match self.connection.confirm(&signature, &reference).await {
            Ok(Confirmation::Confirmed) => {
                info!(step, %signature, "transaction confirmed");
                if kind == StepKind::Terminal {
                    self.outcomes
                        .send_replace(TransactionOutcome::confirmed(&signature));
                }
                Ok(signature)
            }
            Ok(Confirmation::Failed(reason)) => {
                warn!(step, %signature, %reason, "transaction failed on-chain");
                Err(TransferError::TransactionFailed { signature, reason })
            }
            Ok(Confirmation::Expired) => {
                warn!(step, %signature, "blockhash expired before confirmation");
                Err(TransferError::ConfirmationTimeout { signature })
            }
            Err(e) => {
                // Already broadcast: keep the signature so it can be looked up.
                warn!(step, %signature, error = %e, "confirmation polling failed");
                Err(TransferError::TransactionFailed {
                    signature,
                    reason: e.to_string(),
                })
            }
        }
    }
}
