//! Data status command: inspects the collected tables without touching them.

use anyhow::{bail, Result};
use clap::Args;
use extended_data::{TableStatus, TableStore};
use std::path::PathBuf;

use super::load_config;

/// Arguments for the data-status command.
#[derive(Args, Debug, Clone)]
pub struct DataStatusArgs {
    /// Directory holding the output tables (overrides collector.output_dir)
    #[arg(long, env = "EXTENDED_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Runs the data-status command.
///
/// # Errors
/// Returns an error if no table holds any rows.
pub fn run_data_status(config_path: &str, args: DataStatusArgs) -> Result<()> {
    let config = load_config(config_path, args.output_dir)?;
    let store = TableStore::new(&config.collector.output_dir);

    let statuses = TableStatus::inspect_store(&store);
    print_status_report(&store, &statuses);

    let total_rows: usize = statuses.iter().map(|s| s.rows).sum();
    if total_rows == 0 {
        bail!(
            "No rows found in {}; run `extended-stats collect` first",
            store.root().display()
        );
    }
    Ok(())
}

fn print_status_report(store: &TableStore, statuses: &[TableStatus]) {
    println!();
    println!("{}", "=".repeat(80));
    println!("DATA STATUS REPORT: {}", store.root().display());
    println!("{}", "=".repeat(80));

    for status in statuses {
        println!();
        println!("{status}");
    }

    let healthy = statuses.iter().filter(|s| s.is_healthy()).count();
    println!();
    println!("{}", "-".repeat(80));
    println!("{healthy}/{} tables present and readable", statuses.len());
}
