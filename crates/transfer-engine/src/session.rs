use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::TransferConfig;
use crate::discovery::{AccountDiscovery, Portfolio};
use crate::error::TransferError;
use crate::metadata::HttpMetadataFetcher;
use crate::orchestrator::TransactionOrchestrator;
use crate::ports::{ConfirmationPort, Connection, MetadataFetcher, WalletSession};
use crate::types::{OutcomeState, TokenHolding, TransactionOutcome, TransferRequest};
use crate::validator::SubmissionVerdict;

/// One connected wallet's view of the engine: holdings, gating and transfers.
pub struct TransferSession {
    wallet: Arc<dyn WalletSession>,
    discovery: AccountDiscovery,
    portfolio: Portfolio,
    orchestrator: TransactionOrchestrator,
}

impl TransferSession {
    pub fn new(
        connection: Arc<dyn Connection>,
        wallet: Arc<dyn WalletSession>,
        confirmations: Arc<dyn ConfirmationPort>,
        fetcher: Arc<dyn MetadataFetcher>,
        config: TransferConfig,
    ) -> Result<Self, TransferError> {
        config.validate()?;
        info!(cluster = config.cluster.slug(), "transfer session created");

        Ok(Self {
            discovery: AccountDiscovery::new(connection.clone(), fetcher, config.clone()),
            orchestrator: TransactionOrchestrator::new(connection, wallet.clone(), confirmations, config),
            portfolio: Portfolio::new(),
            wallet,
        })
    }

    /// Same as [`TransferSession::new`], fetching off-chain metadata over HTTP.
    pub fn with_http_metadata(
        connection: Arc<dyn Connection>,
        wallet: Arc<dyn WalletSession>,
        confirmations: Arc<dyn ConfirmationPort>,
        config: TransferConfig,
    ) -> Result<Self, TransferError> {
        let fetcher = Arc::new(HttpMetadataFetcher::new(config.metadata_timeout())?);
        Self::new(connection, wallet, confirmations, fetcher, config)
    }

    pub fn holdings(&self) -> Arc<[TokenHolding]> {
        self.portfolio.holdings()
    }

    pub fn subscribe(&self) -> watch::Receiver<TransactionOutcome> {
        self.orchestrator.subscribe()
    }

    pub fn outcome(&self) -> TransactionOutcome {
        self.orchestrator.outcome()
    }

    /// Whether `request` may be submitted right now, and if not, which check failed.
    pub fn verdict(&self, request: &TransferRequest) -> Result<SubmissionVerdict, TransferError> {
        self.orchestrator.verdict(request)
    }

    /// Reconcile with the wallet's current address and rediscover holdings.
    ///
    /// A disconnect or an address change clears the holdings and discards
    /// any discovery still running for the previous owner.
    pub async fn sync_wallet(&self) -> Result<Arc<[TokenHolding]>, TransferError> {
        let known = self.portfolio.owner();
        let Some(current) = self.wallet.address() else {
            if known.is_some() {
                info!("wallet disconnected");
            }
            self.portfolio.invalidate();
            return Ok(self.portfolio.holdings());
        };

        if let Some(previous) = known.filter(|owner| *owner != current) {
            info!(%previous, %current, "wallet changed");
            self.portfolio.invalidate();
        }

        Ok(self
            .portfolio
            .refresh(&self.discovery, &current)
            .await?
            .unwrap_or_else(|| self.portfolio.holdings()))
    }

    /// Run a transfer; after a confirmed one, rebuild the holdings.
    pub async fn transact(
        &self,
        request: TransferRequest,
    ) -> Result<TransactionOutcome, TransferError> {
        let outcome = self.orchestrator.transact(request).await?;

        if outcome.state == OutcomeState::Confirmed {
            if let Some(owner) = self.wallet.address() {
                if let Err(e) = self.portfolio.refresh(&self.discovery, &owner).await {
                    warn!(error = %e, "holdings refresh after transfer failed");
                }
            }
        }
        Ok(outcome)
    }
}
