//! Collection pipeline for Extended exchange statistics.
//!
//! Fetch client with rate limiting and retry, lenient payload models,
//! per-stream normalization, trading-stats backfill planning and the run
//! orchestrator that feeds the table store.

pub mod backfill;
pub mod client;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod payload;
pub mod retry;

pub use backfill::{BackfillScheduler, BackfillTask};
pub use client::FetchClient;
pub use error::{CollectorError, FetchError};
pub use orchestrator::{Collector, RunSummary, StreamOutcome, StreamStatus};
pub use retry::{retry_with_backoff, BackoffPolicy, Exhausted, Retryable};
