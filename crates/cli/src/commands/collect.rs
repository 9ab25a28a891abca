//! Collect command: one pass over every chain and stream.

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;
use extended_collector::Collector;
use std::path::PathBuf;

use super::load_config;

/// Arguments for the collect command.
#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// Directory holding the output tables (overrides collector.output_dir)
    #[arg(long, env = "EXTENDED_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Treat this UTC date as today (YYYY-MM-DD); anchors the trading stats backfill
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Number of days re-fetched for trading stats (overrides collector.lookback_days)
    #[arg(long)]
    pub lookback_days: Option<u32>,
}

/// Runs the collect command.
///
/// # Errors
/// Returns an error if the configuration is invalid or no stream obtained
/// any records.
pub async fn run_collect(config_path: &str, args: CollectArgs) -> Result<()> {
    let mut config = load_config(config_path, args.output_dir)?;
    if let Some(days) = args.lookback_days {
        config.collector.lookback_days = days;
    }
    let today = args.date.unwrap_or_else(|| Utc::now().date_naive());

    let collector = Collector::new(config)?;
    let summary = collector.run(today).await;

    println!();
    println!("{summary}");

    if summary.is_total_failure() {
        bail!(
            "Collection failed: no stream returned any records ({} failed requests)",
            summary.failed_requests()
        );
    }
    Ok(())
}
