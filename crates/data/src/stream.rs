//! Catalogue of the data streams the collector maintains.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One persisted time series. Each stream owns exactly one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Markets,
    TradingStats,
    Funding,
    OrderBook,
    Tvl,
}

impl Stream {
    /// All streams, in the order a collection run processes them.
    pub const ALL: [Stream; 5] = [
        Stream::Markets,
        Stream::Funding,
        Stream::OrderBook,
        Stream::TradingStats,
        Stream::Tvl,
    ];

    /// Warehouse table name; also the CSV file stem.
    #[must_use]
    pub fn table_name(&self) -> &'static str {
        match self {
            Stream::Markets => "extended_markets_data",
            Stream::TradingStats => "extended_trading_stats",
            Stream::Funding => "extended_funding_rates",
            Stream::OrderBook => "extended_orderbook_snapshots",
            Stream::Tvl => "extended_tvl_data",
        }
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.table_name())
    }

    /// Short label used in log lines and summaries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Markets => "markets",
            Stream::TradingStats => "trading_stats",
            Stream::Funding => "funding",
            Stream::OrderBook => "orderbook",
            Stream::Tvl => "tvl",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stream {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "markets" => Ok(Stream::Markets),
            "trading_stats" | "trading" => Ok(Stream::TradingStats),
            "funding" => Ok(Stream::Funding),
            "orderbook" | "order_book" => Ok(Stream::OrderBook),
            "tvl" => Ok(Stream::Tvl),
            _ => Err(anyhow::anyhow!(
                "Invalid stream: '{}'. Valid values: markets, trading_stats, funding, orderbook, tvl",
                s
            )),
        }
    }
}
