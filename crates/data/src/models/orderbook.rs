//! Order book snapshot data model.
//!
//! Captures top-of-book state and visible depth for a market at the moment
//! of collection.

use crate::models::market::spread_pct;
use crate::record::{DedupKey, TableRecord};
use crate::stream::Stream;
use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A snapshot of one market's order book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshotRecord {
    /// When the snapshot was taken
    #[serde(alias = "fetched_at", with = "crate::timestamp")]
    pub collected_at: DateTime<Utc>,
    pub chain: String,
    pub market: String,
    /// Best (first) bid price, zero when the side is empty
    pub best_bid: f64,
    /// Best (first) ask price, zero when the side is empty
    pub best_ask: f64,
    /// (best_bid + best_ask) / 2, zero unless both sides are quoted
    pub mid_price: f64,
    /// (ask - bid) / mid * 100
    pub spread_pct: f64,
    /// Total quantity across bid levels
    pub bid_depth: f64,
    /// Total quantity across ask levels
    pub ask_depth: f64,
    /// Number of bid levels returned
    pub bid_levels: u32,
    /// Number of ask levels returned
    pub ask_levels: u32,
}

impl OrderBookSnapshotRecord {
    /// Creates a snapshot from `(price, qty)` levels, best level first.
    pub fn new(
        collected_at: DateTime<Utc>,
        chain: impl Into<String>,
        market: impl Into<String>,
        bids: &[(f64, f64)],
        asks: &[(f64, f64)],
    ) -> Self {
        let best_bid = bids.first().map_or(0.0, |(p, _)| *p);
        let best_ask = asks.first().map_or(0.0, |(p, _)| *p);

        let mid_price = if best_bid > 0.0 && best_ask > 0.0 {
            (best_bid + best_ask) / 2.0
        } else {
            0.0
        };

        Self {
            collected_at,
            chain: chain.into(),
            market: market.into(),
            best_bid,
            best_ask,
            mid_price,
            spread_pct: spread_pct(best_bid, best_ask, mid_price),
            bid_depth: bids.iter().map(|(_, q)| q).sum(),
            ask_depth: asks.iter().map(|(_, q)| q).sum(),
            bid_levels: u32::try_from(bids.len()).unwrap_or(u32::MAX),
            ask_levels: u32::try_from(asks.len()).unwrap_or(u32::MAX),
        }
    }
}

impl TableRecord for OrderBookSnapshotRecord {
    const STREAM: Stream = Stream::OrderBook;
    const COLUMNS: &'static [&'static str] = &[
        "collected_at",
        "chain",
        "market",
        "best_bid",
        "best_ask",
        "mid_price",
        "spread_pct",
        "bid_depth",
        "ask_depth",
        "bid_levels",
        "ask_levels",
    ];

    fn dedup_key(&self) -> DedupKey {
        DedupKey::new([
            self.chain.clone(),
            self.market.clone(),
            timestamp::format(&self.collected_at),
        ])
    }

    fn sort_key(&self) -> Option<DateTime<Utc>> {
        Some(self.collected_at)
    }
}
