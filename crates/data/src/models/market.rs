//! Market snapshot record.
//!
//! One row per market per collection pass: prices, volumes and open
//! interest as reported by the exchange's markets endpoint.

use crate::record::{DedupKey, TableRecord};
use crate::stream::Stream;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of one market's statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    /// When the collector observed the market
    #[serde(alias = "fetched_at", with = "crate::timestamp")]
    pub collected_at: DateTime<Utc>,
    /// Chain label (e.g. "ethereum")
    pub chain: String,
    /// Market name (e.g. "BTC-USD")
    pub market: String,
    #[serde(alias = "lastPrice")]
    pub last_price: f64,
    #[serde(alias = "bidPrice")]
    pub bid_price: f64,
    #[serde(alias = "askPrice")]
    pub ask_price: f64,
    #[serde(default, alias = "markPrice")]
    pub mark_price: f64,
    #[serde(default, alias = "indexPrice")]
    pub index_price: f64,
    /// 24h volume in quote currency
    #[serde(default, alias = "dailyVolume")]
    pub daily_volume: f64,
    /// 24h volume in base currency
    #[serde(default, alias = "dailyVolumeBase")]
    pub daily_volume_base: f64,
    #[serde(default, alias = "openInterest")]
    pub open_interest: f64,
    #[serde(default, alias = "fundingRate")]
    pub funding_rate: f64,
    #[serde(default, alias = "priceChange24h")]
    pub price_change_24h: f64,
    /// (ask - bid) / last * 100, zero without a live quote
    #[serde(default)]
    pub spread_pct: f64,
}

/// Bid/ask spread as a percentage of the reference price.
///
/// Returns zero unless bid, ask and reference are all strictly positive.
#[must_use]
pub fn spread_pct(bid: f64, ask: f64, reference: f64) -> f64 {
    if bid > 0.0 && ask > 0.0 && reference > 0.0 {
        (ask - bid) / reference * 100.0
    } else {
        0.0
    }
}

impl MarketRecord {
    /// Hour bucket of `collected_at`, part of the dedup key.
    ///
    /// Two passes within the same hour describe the same observation;
    /// the later one replaces the earlier.
    #[must_use]
    pub fn hour_bucket(&self) -> String {
        self.collected_at.format("%Y-%m-%dT%H").to_string()
    }
}

impl TableRecord for MarketRecord {
    const STREAM: Stream = Stream::Markets;
    const COLUMNS: &'static [&'static str] = &[
        "collected_at",
        "chain",
        "market",
        "last_price",
        "bid_price",
        "ask_price",
        "mark_price",
        "index_price",
        "daily_volume",
        "daily_volume_base",
        "open_interest",
        "funding_rate",
        "price_change_24h",
        "spread_pct",
    ];

    fn dedup_key(&self) -> DedupKey {
        DedupKey::new([self.chain.clone(), self.market.clone(), self.hour_bucket()])
    }

    fn sort_key(&self) -> Option<DateTime<Utc>> {
        Some(self.collected_at)
    }
}
