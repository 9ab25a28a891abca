//! Collector configuration.
//!
//! Every component receives the parts of [`AppConfig`] it needs at
//! construction time. Nothing here is global or mutable after loading.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default DeFiLlama protocol endpoint for Extended TVL.
pub const DEFAULT_TVL_URL: &str = "https://api.llama.fi/protocol/extended";

/// Default Dune API base URL.
pub const DEFAULT_WAREHOUSE_URL: &str = "https://api.dune.com/api/v1";

/// Configuration problems detected while loading or validating.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config sources could not be merged or extracted.
    #[error("failed to load configuration: {0}")]
    Load(String),

    /// A value is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub collector: CollectorSettings,
    pub http: HttpConfig,
    pub chains: Vec<ChainConfig>,
    pub tvl_url: String,
    pub retention: RetentionConfig,
    pub warehouse: WarehouseConfig,
}

/// What a collection run does and where it writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorSettings {
    /// Directory holding one CSV table per stream
    pub output_dir: PathBuf,
    /// Number of calendar days (including today) re-fetched for trading stats
    pub lookback_days: u32,
    /// Maximum markets per chain for which order books are snapshotted
    pub orderbook_market_limit: usize,
    /// Fetch funding rates for collected markets
    pub collect_funding: bool,
    /// Fetch order book snapshots for collected markets
    pub collect_orderbook: bool,
}

/// HTTP timeout, retry and throttling policy shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on every further retry
    pub base_delay_ms: u64,
    /// Upper bound for a single backoff delay
    pub max_delay_ms: u64,
    pub requests_per_second: u32,
}

impl HttpConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// One deployment of the exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    /// Chain label written into every record (e.g. "ethereum")
    pub name: String,
    pub markets_url: String,
    /// Daily trading stats endpoint, queried with `fromDate`/`toDate`
    pub trading_url: String,
    /// Funding history endpoint, queried with `market`
    #[serde(default)]
    pub funding_url: Option<String>,
    /// Order book endpoint, queried with `market`
    #[serde(default)]
    pub orderbook_url: Option<String>,
    /// First calendar day the chain served traffic
    pub activation_date: NaiveDate,
}

impl ChainConfig {
    /// Returns true if the chain existed on `date`.
    #[must_use]
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        date >= self.activation_date
    }
}

/// Maximum rows kept per table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionConfig {
    pub markets: usize,
    pub trading_stats: usize,
    pub funding: usize,
    pub orderbook: usize,
    pub tvl: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            markets: 50_000,
            trading_stats: 10_000,
            funding: 20_000,
            orderbook: 20_000,
            tvl: 10_000,
        }
    }
}

/// Upload target settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub api_url: String,
    /// Only required by the upload command
    #[serde(default)]
    pub api_key: Option<String>,
    pub is_private: bool,
    /// Account namespace, used in log lines only
    #[serde(default)]
    pub namespace: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            collector: CollectorSettings {
                output_dir: PathBuf::from("uploads"),
                lookback_days: 7,
                orderbook_market_limit: 5,
                collect_funding: true,
                collect_orderbook: true,
            },
            http: HttpConfig {
                timeout_secs: 30,
                max_attempts: 3,
                base_delay_ms: 1_000,
                max_delay_ms: 30_000,
                requests_per_second: 10,
            },
            chains: vec![
                ChainConfig {
                    name: "ethereum".to_string(),
                    markets_url: "https://api.extended.exchange/api/v1/info/markets".to_string(),
                    trading_url: "https://api.extended.exchange/api/v1/exchange/stats/trading"
                        .to_string(),
                    funding_url: Some(
                        "https://api.extended.exchange/api/v1/info/funding".to_string(),
                    ),
                    orderbook_url: Some(
                        "https://api.extended.exchange/api/v1/info/orderbook".to_string(),
                    ),
                    activation_date: ymd(2025, 3, 11),
                },
                ChainConfig {
                    name: "starknet".to_string(),
                    markets_url: "https://api.starknet.extended.exchange/api/v1/info/markets"
                        .to_string(),
                    trading_url:
                        "https://api.starknet.extended.exchange/api/v1/exchange/stats/trading"
                            .to_string(),
                    funding_url: Some(
                        "https://api.starknet.extended.exchange/api/v1/info/funding".to_string(),
                    ),
                    orderbook_url: Some(
                        "https://api.starknet.extended.exchange/api/v1/info/orderbook".to_string(),
                    ),
                    activation_date: ymd(2025, 8, 10),
                },
            ],
            tvl_url: DEFAULT_TVL_URL.to_string(),
            retention: RetentionConfig::default(),
            warehouse: WarehouseConfig {
                api_url: DEFAULT_WAREHOUSE_URL.to_string(),
                api_key: None,
                is_private: false,
                namespace: None,
            },
        }
    }
}

impl AppConfig {
    /// Checks invariants that serde cannot express.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chains.is_empty() {
            return Err(ConfigError::Invalid("at least one chain is required".into()));
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if chain.name.trim().is_empty() {
                return Err(ConfigError::Invalid("chain name must not be empty".into()));
            }
            if !seen.insert(chain.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate chain name '{}'",
                    chain.name
                )));
            }
            if chain.markets_url.trim().is_empty() || chain.trading_url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "chain '{}' is missing an endpoint URL",
                    chain.name
                )));
            }
        }

        if self.tvl_url.trim().is_empty() {
            return Err(ConfigError::Invalid("tvl_url must not be empty".into()));
        }
        if self.http.max_attempts == 0 {
            return Err(ConfigError::Invalid("http.max_attempts must be > 0".into()));
        }
        if self.http.requests_per_second == 0 {
            return Err(ConfigError::Invalid(
                "http.requests_per_second must be > 0".into(),
            ));
        }

        let r = &self.retention;
        if [r.markets, r.trading_stats, r.funding, r.orderbook, r.tvl].contains(&0) {
            return Err(ConfigError::Invalid("retention caps must be > 0".into()));
        }

        Ok(())
    }

    /// Looks up a chain by name.
    #[must_use]
    pub fn chain(&self, name: &str) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.name == name)
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}
