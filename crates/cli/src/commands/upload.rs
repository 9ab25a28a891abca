//! Upload command: pushes every collected table to the warehouse.

use anyhow::{bail, Result};
use clap::Args;
use extended_data::Stream;
use extended_warehouse::{upload_all, DuneUploader};
use std::path::PathBuf;

use super::load_config;

/// Arguments for the upload command.
#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Directory holding the output tables (overrides collector.output_dir)
    #[arg(long, env = "EXTENDED_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Streams to upload, comma separated (default: all)
    #[arg(long, value_delimiter = ',')]
    pub streams: Vec<Stream>,
}

/// Runs the upload command.
///
/// # Errors
/// Returns an error if no API key is configured or no table was uploaded.
pub async fn run_upload(config_path: &str, args: UploadArgs) -> Result<()> {
    let config = load_config(config_path, args.output_dir)?;
    let uploader = DuneUploader::new(&config.warehouse)?;

    let streams = if args.streams.is_empty() {
        Stream::ALL.to_vec()
    } else {
        args.streams
    };

    let output_dir = &config.collector.output_dir;
    tracing::info!(
        output_dir = %output_dir.display(),
        tables = streams.len(),
        "Uploading tables"
    );

    let summary = upload_all(&uploader, output_dir, &streams).await;

    println!();
    print!("{summary}");

    if !summary.is_success() {
        bail!("No table was uploaded");
    }
    if summary.failed() > 0 {
        tracing::warn!(failed = summary.failed(), "Some uploads failed");
    }
    Ok(())
}
