use std::time::Duration;

use chain_sol::NATIVE_DECIMALS;
use serde::{Deserialize, Serialize};

use crate::error::TransferError;
use crate::types::Cluster;

/// Logo used for the native SOL holding.
pub const SOL_ICON_URI: &str = "https://raw.githubusercontent.com/solana-labs/token-list/main/assets/mainnet/So11111111111111111111111111111111111111112/logo.png";

/// Engine settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    /// Cluster whose token registry is consulted.
    pub cluster: Cluster,
    pub native_symbol: String,
    pub native_icon_uri: String,
    /// Exponent of the native currency's unit scale (10^9 lamports per SOL).
    pub native_decimals: u32,
    /// Timeout for fetching off-chain token metadata.
    pub metadata_timeout_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::Devnet,
            native_symbol: "SOL".to_string(),
            native_icon_uri: SOL_ICON_URI.to_string(),
            native_decimals: NATIVE_DECIMALS,
            metadata_timeout_ms: 10_000,
        }
    }
}

impl TransferConfig {
    pub fn for_cluster(cluster: Cluster) -> Self {
        Self {
            cluster,
            ..Self::default()
        }
    }

    /// Parse a JSON config document and check its invariants.
    pub fn from_json(json: &str) -> Result<Self, TransferError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TransferError> {
        // 10^19 no longer fits a u64 minor-unit amount.
        if self.native_decimals > 18 {
            return Err(TransferError::Config(format!(
                "native_decimals {} is out of range (max 18)",
                self.native_decimals
            )));
        }
        if self.native_symbol.trim().is_empty() {
            return Err(TransferError::Config("native_symbol is empty".into()));
        }
        if self.metadata_timeout_ms == 0 {
            return Err(TransferError::Config(
                "metadata_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }
}
