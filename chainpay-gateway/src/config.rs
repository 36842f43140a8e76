//! Gateway configuration.
//!
//! Explorer endpoints, API keys, and timeouts are explicit constructor
//! inputs. Tests point `base_url`/`price_url` at a mock server; production
//! wiring uses the mainnet or testnet defaults.

use serde::{Deserialize, Serialize};

/// Default request timeout for explorer and price calls.
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Configuration for the bitcoin-style gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BitcoinConfig {
    /// Explorer API token.
    pub api_key: String,
    /// Explorer base URL (chain root; addresses, transactions, and the
    /// fee-carrying chain info all hang off it).
    pub base_url: String,
    /// Spot price endpoint returning `{"bitcoin": {"usd": <price>}}`.
    pub price_url: String,
    /// Whether this points at a test network.
    pub testnet: bool,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl BitcoinConfig {
    /// Mainnet defaults with the given explorer API key.
    pub fn mainnet(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.blockcypher.com/v1/btc/main".into(),
            price_url: "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd"
                .into(),
            testnet: false,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Testnet defaults with the given explorer API key.
    pub fn testnet(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.blockcypher.com/v1/btc/test3".into(),
            testnet: true,
            ..Self::mainnet(api_key)
        }
    }
}

/// Configuration for the ethereum-style gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EthereumConfig {
    /// Explorer API key.
    pub api_key: String,
    /// Explorer API base URL (module/action query-style).
    pub base_url: String,
    /// Spot price endpoint returning `{"ethereum": {"usd": <price>}}`.
    pub price_url: String,
    /// Whether this points at a test network.
    pub testnet: bool,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl EthereumConfig {
    /// Mainnet defaults with the given explorer API key.
    pub fn mainnet(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.etherscan.io/api".into(),
            price_url:
                "https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd"
                    .into(),
            testnet: false,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Sepolia defaults with the given explorer API key.
    pub fn testnet(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api-sepolia.etherscan.io/api".into(),
            testnet: true,
            ..Self::mainnet(api_key)
        }
    }
}
