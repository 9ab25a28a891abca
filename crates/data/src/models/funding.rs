//! Funding rate data model.
//!
//! Captures perpetual funding rate observations per market. The exchange
//! reports a business timestamp (`funding_time`) that differs from when
//! the collector saw it.

use crate::record::{DedupKey, TableRecord};
use crate::stream::Stream;
use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A funding rate observation for one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRateRecord {
    /// When the collector observed the rate
    #[serde(alias = "fetched_at", with = "crate::timestamp")]
    pub collected_at: DateTime<Utc>,
    /// Chain label (e.g. "starknet")
    pub chain: String,
    /// Market name (e.g. "ETH-USD")
    pub market: String,
    /// Hourly funding rate (e.g. 0.0001 = 0.01%)
    pub funding_rate: f64,
    /// Funding timestamp reported by the exchange
    #[serde(default, with = "crate::timestamp::option")]
    pub funding_time: Option<DateTime<Utc>>,
}

impl FundingRateRecord {
    pub fn new(
        collected_at: DateTime<Utc>,
        chain: impl Into<String>,
        market: impl Into<String>,
        funding_rate: f64,
        funding_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            collected_at,
            chain: chain.into(),
            market: market.into(),
            funding_rate,
            funding_time,
        }
    }
}

impl TableRecord for FundingRateRecord {
    const STREAM: Stream = Stream::Funding;
    const COLUMNS: &'static [&'static str] =
        &["collected_at", "chain", "market", "funding_rate", "funding_time"];

    /// Keyed by the exchange's funding time so re-fetching the same
    /// history window collapses; falls back to `collected_at`.
    fn dedup_key(&self) -> DedupKey {
        let at = self.funding_time.unwrap_or(self.collected_at);
        DedupKey::new([
            self.chain.clone(),
            self.market.clone(),
            timestamp::format(&at),
        ])
    }

    fn sort_key(&self) -> Option<DateTime<Utc>> {
        self.funding_time
    }

    fn fallback_sort_key(&self) -> Option<DateTime<Utc>> {
        Some(self.collected_at)
    }
}
