//! CLI commands for the statistics collector.

pub mod collect;
pub mod data_status;
pub mod upload;

pub use collect::{run_collect, CollectArgs};
pub use data_status::{run_data_status, DataStatusArgs};
pub use upload::{run_upload, UploadArgs};

use anyhow::{Context, Result};
use extended_core::{AppConfig, ConfigLoader};
use std::path::PathBuf;

/// Loads configuration and applies an optional output directory override.
fn load_config(path: &str, output_dir: Option<PathBuf>) -> Result<AppConfig> {
    let mut config =
        ConfigLoader::load(path).with_context(|| format!("Failed to load config from {path}"))?;
    if let Some(dir) = output_dir {
        config.collector.output_dir = dir;
    }
    Ok(config)
}
