//! Flat, fixed-schema records for each collected stream.
//!
//! Field names are the CSV column names. Legacy column spellings written by
//! earlier collector revisions are accepted through serde aliases so an old
//! table merges instead of being discarded.

pub mod funding;
pub mod market;
pub mod orderbook;
pub mod trading_stats;
pub mod tvl;

pub use funding::FundingRateRecord;
pub use market::{spread_pct, MarketRecord};
pub use orderbook::OrderBookSnapshotRecord;
pub use trading_stats::TradingStatsRecord;
pub use tvl::{TvlRecord, TOTAL_CHAIN_LABEL};
