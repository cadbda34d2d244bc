//! Token display metadata, resolved in tiers:
//! static registry, then on-chain Metaplex metadata plus its off-chain JSON,
//! then the mint address itself as the symbol.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chain_sol::{address_to_bytes, bytes_to_address, decode_metadata_account, derive_metadata_address};
use futures::future::join_all;
use tracing::debug;

use crate::error::TransferError;
use crate::ports::{Connection, MetadataFetcher};
use crate::registry::TokenRegistry;
use crate::types::TokenMetadata;

/// Off-chain metadata over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
}

impl HttpMetadataFetcher {
    pub fn new(timeout: Duration) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch_json(&self, uri: &str) -> Result<serde_json::Value, TransferError> {
        let response = self.client.get(uri).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

pub struct TokenMetadataResolver {
    registry: TokenRegistry,
    connection: Arc<dyn Connection>,
    fetcher: Arc<dyn MetadataFetcher>,
}

impl TokenMetadataResolver {
    pub fn new(
        registry: TokenRegistry,
        connection: Arc<dyn Connection>,
        fetcher: Arc<dyn MetadataFetcher>,
    ) -> Self {
        Self {
            registry,
            connection,
            fetcher,
        }
    }

    /// Resolve display metadata for `mint`. Never fails: anything that goes
    /// wrong past the registry degrades to [`TokenMetadata::Fallback`].
    pub async fn resolve(&self, mint: &str) -> TokenMetadata {
        if let Some(known) = self.registry.lookup(mint) {
            return TokenMetadata::Registry {
                symbol: known.symbol.to_string(),
                icon_uri: known.logo_uri.to_string(),
            };
        }

        match self.resolve_on_chain(mint).await {
            Ok(Some(meta)) => meta,
            Ok(None) => {
                debug!(mint, "no on-chain metadata, using fallback");
                TokenMetadata::fallback(mint)
            }
            Err(e) => {
                debug!(mint, error = %e, "metadata lookup failed, using fallback");
                TokenMetadata::fallback(mint)
            }
        }
    }

    /// Resolve several mints concurrently, each distinct mint once.
    pub async fn resolve_all<'a, I>(&self, mints: I) -> HashMap<String, TokenMetadata>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut unique: Vec<&str> = Vec::new();
        for mint in mints {
            if !unique.contains(&mint) {
                unique.push(mint);
            }
        }

        join_all(
            unique
                .into_iter()
                .map(|mint| async move { (mint.to_string(), self.resolve(mint).await) }),
        )
        .await
        .into_iter()
        .collect()
    }

    async fn resolve_on_chain(&self, mint: &str) -> Result<Option<TokenMetadata>, TransferError> {
        let mint_bytes = address_to_bytes(mint)?;
        let metadata_address = bytes_to_address(&derive_metadata_address(&mint_bytes)?);

        let Some(data) = self.connection.get_account_data(&metadata_address).await? else {
            return Ok(None);
        };
        let on_chain = decode_metadata_account(&data)?;
        if on_chain.uri.is_empty() {
            return Err(TransferError::Metadata(format!(
                "metadata account {metadata_address} has no uri"
            )));
        }

        let document = self.fetcher.fetch_json(&on_chain.uri).await?;
        let field = |name: &str| {
            document
                .get(name)
                .and_then(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let symbol = Some(on_chain.symbol)
            .filter(|s| !s.is_empty())
            .or_else(|| field("symbol"))
            .ok_or_else(|| TransferError::Metadata(format!("no symbol for {mint}")))?;
        let icon_uri = field("image").unwrap_or_default();

        Ok(Some(TokenMetadata::OnChain { symbol, icon_uri }))
    }
}
