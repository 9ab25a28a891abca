//! Record models and persistence for the Extended statistics collector.
//!
//! This crate provides:
//! - Typed records for each collected stream
//! - The merge-dedupe-cap CSV table store
//! - Table health inspection

pub mod models;
pub mod record;
pub mod stream;
pub mod table_status;
pub mod table_store;
pub mod timestamp;

pub use models::{
    FundingRateRecord, MarketRecord, OrderBookSnapshotRecord, TradingStatsRecord, TvlRecord,
    TOTAL_CHAIN_LABEL,
};
pub use record::{DedupKey, TableRecord};
pub use stream::Stream;
pub use table_status::TableStatus;
pub use table_store::{merge_dedupe_cap, MergeOutcome, Merged, StoreError, TableStore};
