//! Uploading every collected table.

use crate::error::UploadError;
use crate::uploader::WarehouseUploader;
use extended_data::Stream;
use std::fmt;
use std::path::Path;

/// What happened to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableUpload {
    Uploaded,
    /// Missing or empty file
    Skipped(String),
    Failed(String),
}

/// Result of [`upload_all`].
#[derive(Debug, Clone, Default)]
pub struct UploadSummary {
    /// Tables an upload was attempted for
    pub attempted: usize,
    pub succeeded: usize,
    pub tables: Vec<(Stream, TableUpload)>,
}

impl UploadSummary {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.succeeded > 0
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Upload summary: {}/{} tables uploaded",
            self.succeeded, self.attempted
        )?;
        for (stream, result) in &self.tables {
            match result {
                TableUpload::Uploaded => writeln!(f, "  {:<24} uploaded", stream.table_name())?,
                TableUpload::Skipped(why) => {
                    writeln!(f, "  {:<24} skipped ({why})", stream.table_name())?;
                }
                TableUpload::Failed(err) => {
                    writeln!(f, "  {:<24} FAILED: {err}", stream.table_name())?;
                }
            }
        }
        Ok(())
    }
}

/// Uploads the table of each stream found in `output_dir`.
///
/// Missing and empty tables are skipped. A failed upload does not stop the
/// remaining ones.
pub async fn upload_all<U: WarehouseUploader + ?Sized>(
    uploader: &U,
    output_dir: &Path,
    streams: &[Stream],
) -> UploadSummary {
    let mut summary = UploadSummary::default();

    for &stream in streams {
        let path = output_dir.join(stream.file_name());
        let result = match uploader.upload(&path, stream.table_name()).await {
            Ok(()) => {
                summary.attempted += 1;
                summary.succeeded += 1;
                TableUpload::Uploaded
            }
            Err(e) if e.is_nothing_to_upload() => {
                tracing::warn!(%stream, "Skipping upload: {}", e);
                TableUpload::Skipped(e.to_string())
            }
            Err(e) => {
                summary.attempted += 1;
                log_failure(stream, &e);
                TableUpload::Failed(e.to_string())
            }
        };
        summary.tables.push((stream, result));
    }

    summary
}

fn log_failure(stream: Stream, err: &UploadError) {
    match err {
        UploadError::Api { .. } | UploadError::Network(_) => {
            tracing::warn!(%stream, "Upload failed: {}", err);
        }
        _ => tracing::error!(%stream, error = ?err, "Upload failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records calls and fails for one table name.
    struct FakeUploader {
        fail_table: &'static str,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WarehouseUploader for FakeUploader {
        async fn upload(&self, path: &Path, table_name: &str) -> Result<(), UploadError> {
            self.calls.lock().unwrap().push(table_name.to_string());
            if !path.exists() {
                return Err(UploadError::MissingFile(PathBuf::from(path)));
            }
            if table_name == self.fail_table {
                return Err(UploadError::api(500, "boom"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_upload_all_counts() {
        let dir = tempfile::TempDir::new().unwrap();
        for stream in [Stream::Markets, Stream::TradingStats, Stream::Tvl] {
            std::fs::write(dir.path().join(stream.file_name()), "a\n1\n").unwrap();
        }
        let uploader = FakeUploader {
            fail_table: "extended_trading_stats",
            calls: Mutex::new(Vec::new()),
        };

        let summary = upload_all(&uploader, dir.path(), &Stream::ALL).await;

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed(), 1);
        assert!(summary.is_success());
        assert_eq!(uploader.calls.lock().unwrap().len(), 5);
        assert!(summary
            .tables
            .iter()
            .any(|(s, r)| *s == Stream::Funding && matches!(r, TableUpload::Skipped(_))));
        assert!(summary.to_string().contains("2/3 tables uploaded"));
    }

    #[tokio::test]
    async fn test_upload_all_nothing_present() {
        let dir = tempfile::TempDir::new().unwrap();
        let uploader = FakeUploader {
            fail_table: "",
            calls: Mutex::new(Vec::new()),
        };

        let summary = upload_all(&uploader, dir.path(), &Stream::ALL).await;

        assert_eq!(summary.attempted, 0);
        assert!(!summary.is_success());
    }
}
