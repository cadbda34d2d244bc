//! Wallet holdings: the native balance plus one entry per SPL mint owned.

use std::sync::Arc;

use chain_sol::{bytes_to_address, TOKEN_ACCOUNT_LEN, TOKEN_ACCOUNT_OWNER_OFFSET, TOKEN_PROGRAM_ID};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::metadata::TokenMetadataResolver;
use crate::ports::{Connection, MetadataFetcher, ProgramAccount, ProgramAccountFilter};
use crate::registry::TokenRegistry;
use crate::types::{MintRef, TokenHolding};

#[derive(Debug, Deserialize)]
struct ParsedAccountData {
    parsed: ParsedBody,
}

#[derive(Debug, Deserialize)]
struct ParsedBody {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    mint: String,
    token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
struct TokenAmount {
    /// Raw base units, as a decimal string.
    amount: String,
    decimals: u32,
}

/// One token account's contribution to a holding, before metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenBalance {
    pub mint: String,
    pub raw_amount: u128,
    pub decimals: u32,
}

impl TokenBalance {
    fn ui_balance(&self) -> Option<Decimal> {
        let raw = i128::try_from(self.raw_amount).ok()?;
        Decimal::try_from_i128_with_scale(raw, self.decimals).ok()
    }
}

pub(crate) fn parse_token_account(account: &ProgramAccount) -> Result<TokenBalance, String> {
    let data: ParsedAccountData =
        serde_json::from_value(account.data.clone()).map_err(|e| e.to_string())?;
    let info = data.parsed.info;

    chain_sol::validate_address(&info.mint).map_err(|e| e.to_string())?;
    let raw_amount = info
        .token_amount
        .amount
        .parse::<u128>()
        .map_err(|e| format!("bad amount {:?}: {e}", info.token_amount.amount))?;

    Ok(TokenBalance {
        mint: info.mint,
        raw_amount,
        decimals: info.token_amount.decimals,
    })
}

/// Merge balances that share a mint, keeping first-seen order.
pub(crate) fn aggregate_by_mint(balances: Vec<TokenBalance>) -> Vec<TokenBalance> {
    let mut merged: Vec<TokenBalance> = Vec::with_capacity(balances.len());
    for balance in balances {
        match merged.iter_mut().find(|b| b.mint == balance.mint) {
            Some(existing) => {
                existing.raw_amount = existing.raw_amount.saturating_add(balance.raw_amount);
            }
            None => merged.push(balance),
        }
    }
    merged
}

/// Result of one discovery pass.
///
/// `holdings` is always usable: when listing token accounts fails, it still
/// carries the native holding and `error` says why the rest is missing.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub holdings: Vec<TokenHolding>,
    pub error: Option<TransferError>,
}

pub struct AccountDiscovery {
    connection: Arc<dyn Connection>,
    resolver: TokenMetadataResolver,
    config: TransferConfig,
}

impl AccountDiscovery {
    pub fn new(
        connection: Arc<dyn Connection>,
        fetcher: Arc<dyn MetadataFetcher>,
        config: TransferConfig,
    ) -> Self {
        let resolver = TokenMetadataResolver::new(
            TokenRegistry::new(config.cluster),
            connection.clone(),
            fetcher,
        );
        Self {
            connection,
            resolver,
            config,
        }
    }

    pub fn token_account_filters(owner: &str) -> Vec<ProgramAccountFilter> {
        vec![
            ProgramAccountFilter::DataSize(TOKEN_ACCOUNT_LEN),
            ProgramAccountFilter::Memcmp {
                offset: TOKEN_ACCOUNT_OWNER_OFFSET,
                bytes: owner.to_string(),
            },
        ]
    }

    /// List `owner`'s holdings: native first, then tokens in the order the
    /// RPC returned their first account.
    pub async fn discover(&self, owner: &str) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let lamports = match self.connection.get_balance(owner).await {
            Ok(lamports) => lamports,
            Err(e) => {
                warn!(owner, error = %e, "native balance lookup failed");
                report.error = Some(into_network(e));
                return report;
            }
        };
        match self.native_holding(lamports) {
            Some(native) => report.holdings.push(native),
            None => {
                report.error = Some(TransferError::Config(format!(
                    "native balance {lamports} does not fit {} decimals",
                    self.config.native_decimals
                )));
                return report;
            }
        }

        let accounts = match self
            .connection
            .get_parsed_program_accounts(
                &bytes_to_address(&TOKEN_PROGRAM_ID),
                &Self::token_account_filters(owner),
            )
            .await
        {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(owner, error = %e, "token account listing failed");
                report.error = Some(into_network(e));
                return report;
            }
        };

        let mut balances = Vec::with_capacity(accounts.len());
        for account in &accounts {
            match parse_token_account(account) {
                Ok(balance) => balances.push(balance),
                Err(reason) => warn!(pubkey = %account.pubkey, %reason, "skipping token account"),
            }
        }
        let balances = aggregate_by_mint(balances);

        let metadata = self
            .resolver
            .resolve_all(balances.iter().map(|b| b.mint.as_str()))
            .await;

        for balance in balances {
            let Some(ui_balance) = balance.ui_balance() else {
                warn!(mint = %balance.mint, decimals = balance.decimals, "balance out of range, skipping");
                continue;
            };
            let (symbol, icon_uri) = match metadata.get(&balance.mint) {
                Some(meta) => (meta.symbol().to_string(), meta.icon_uri().to_string()),
                None => (balance.mint.clone(), String::new()),
            };
            report.holdings.push(TokenHolding::new(
                MintRef::Token(balance.mint),
                ui_balance,
                balance.decimals,
                symbol,
                icon_uri,
            ));
        }

        info!(
            owner,
            accounts = accounts.len(),
            holdings = report.holdings.len(),
            "discovery complete"
        );
        report
    }

    fn native_holding(&self, lamports: u64) -> Option<TokenHolding> {
        let balance =
            Decimal::try_from_i128_with_scale(i128::from(lamports), self.config.native_decimals)
                .ok()?;
        Some(TokenHolding::new(
            MintRef::Native,
            balance,
            self.config.native_decimals,
            self.config.native_symbol.clone(),
            self.config.native_icon_uri.clone(),
        ))
    }
}

fn into_network(e: TransferError) -> TransferError {
    match e {
        TransferError::Network(_) => e,
        other => TransferError::Network(other.to_string()),
    }
}

#[derive(Debug, Default)]
struct PortfolioState {
    owner: Option<String>,
    epoch: u64,
    holdings: Arc<[TokenHolding]>,
}

/// The current wallet's holdings, replaced wholesale on every refresh.
///
/// Every refresh and invalidation bumps an epoch; a discovery that finishes
/// after a newer epoch started is discarded.
#[derive(Debug, Default)]
pub struct Portfolio {
    state: Mutex<PortfolioState>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holdings(&self) -> Arc<[TokenHolding]> {
        self.state.lock().holdings.clone()
    }

    pub fn owner(&self) -> Option<String> {
        self.state.lock().owner.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Drop the holdings and forget the owner. In-flight refreshes become stale.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        state.owner = None;
        state.holdings = Arc::from(Vec::new());
        debug!(epoch = state.epoch, "portfolio invalidated");
    }

    /// Run discovery for `owner` and install the result.
    ///
    /// Returns `Ok(None)` if the result went stale before it arrived. A
    /// listing failure still installs the partial holdings, then returns the
    /// error.
    pub async fn refresh(
        &self,
        discovery: &AccountDiscovery,
        owner: &str,
    ) -> Result<Option<Arc<[TokenHolding]>>, TransferError> {
        let epoch = {
            let mut state = self.state.lock();
            if state.owner.as_deref() != Some(owner) {
                state.holdings = Arc::from(Vec::new());
                state.owner = Some(owner.to_string());
            }
            state.epoch += 1;
            state.epoch
        };

        let report = discovery.discover(owner).await;

        let holdings = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                debug!(owner, epoch, current = state.epoch, "discarding stale discovery");
                return Ok(None);
            }
            let holdings: Arc<[TokenHolding]> = report.holdings.into();
            state.holdings = holdings.clone();
            holdings
        };

        match report.error {
            Some(e) => Err(e),
            None => Ok(Some(holdings)),
        }
    }
}
