use crate::types::Cluster;

/// A well-known token on one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownToken {
    pub cluster: Cluster,
    pub mint: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    pub logo_uri: &'static str,
}

macro_rules! logo {
    ($mint:literal) => {
        concat!(
            "https://raw.githubusercontent.com/solana-labs/token-list/main/assets/mainnet/",
            $mint,
            "/logo.png"
        )
    };
}

/// Wrapped SOL. Same mint on every cluster.
pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

const KNOWN_TOKENS: &[KnownToken] = &[
    KnownToken {
        cluster: Cluster::MainnetBeta,
        mint: WRAPPED_SOL_MINT,
        symbol: "SOL",
        name: "Wrapped SOL",
        logo_uri: logo!("So11111111111111111111111111111111111111112"),
    },
    KnownToken {
        cluster: Cluster::MainnetBeta,
        mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        symbol: "USDC",
        name: "USD Coin",
        logo_uri: logo!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
    },
    KnownToken {
        cluster: Cluster::MainnetBeta,
        mint: "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
        symbol: "USDT",
        name: "USDT",
        logo_uri: logo!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
    },
    KnownToken {
        cluster: Cluster::Devnet,
        mint: WRAPPED_SOL_MINT,
        symbol: "SOL",
        name: "Wrapped SOL",
        logo_uri: logo!("So11111111111111111111111111111111111111112"),
    },
    KnownToken {
        cluster: Cluster::Devnet,
        mint: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
        symbol: "USDC",
        name: "USD Coin (Devnet)",
        logo_uri: logo!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
    },
    KnownToken {
        cluster: Cluster::Testnet,
        mint: WRAPPED_SOL_MINT,
        symbol: "SOL",
        name: "Wrapped SOL",
        logo_uri: logo!("So11111111111111111111111111111111111111112"),
    },
];

/// Static, cluster-scoped list of known tokens.
#[derive(Debug, Clone, Copy)]
pub struct TokenRegistry {
    cluster: Cluster,
}

impl TokenRegistry {
    pub fn new(cluster: Cluster) -> Self {
        Self { cluster }
    }

    pub fn cluster(&self) -> Cluster {
        self.cluster
    }

    /// Look up `mint` on this registry's cluster only.
    pub fn lookup(&self, mint: &str) -> Option<&'static KnownToken> {
        KNOWN_TOKENS
            .iter()
            .find(|t| t.cluster == self.cluster && t.mint == mint)
    }
}
