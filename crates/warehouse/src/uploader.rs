//! Warehouse upload clients.

use crate::error::UploadError;
use crate::sanitize::prepare_csv;
use async_trait::async_trait;
use extended_core::WarehouseConfig;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Upload request timeout. Tables can be tens of megabytes.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Destination for collected tables.
#[async_trait]
pub trait WarehouseUploader: Send + Sync {
    /// Uploads the CSV table at `path` into `table_name`, replacing its
    /// previous content.
    async fn upload(&self, path: &Path, table_name: &str) -> Result<(), UploadError>;
}

#[derive(Debug, Serialize)]
struct CsvUploadRequest<'a> {
    table_name: &'a str,
    data: &'a str,
    description: String,
    is_private: bool,
}

/// Dune `table/upload/csv` client.
pub struct DuneUploader {
    http: Client,
    api_url: String,
    api_key: String,
    is_private: bool,
    namespace: Option<String>,
}

impl std::fmt::Debug for DuneUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuneUploader")
            .field("api_url", &self.api_url)
            .field("is_private", &self.is_private)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl DuneUploader {
    /// Creates an uploader from the warehouse settings.
    ///
    /// # Errors
    /// [`UploadError::Configuration`] if no API key is configured.
    pub fn new(config: &WarehouseConfig) -> Result<Self, UploadError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                UploadError::Configuration(
                    "warehouse API key not set (DUNE_API_KEY or EXTENDED_WAREHOUSE__API_KEY)"
                        .into(),
                )
            })?
            .to_string();

        let http = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| UploadError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            is_private: config.is_private,
            namespace: config.namespace.clone(),
        })
    }

    /// Fully qualified table name for log lines.
    #[must_use]
    pub fn qualified_name(&self, table_name: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("dune.{ns}.dataset_{table_name}"),
            None => format!("dataset_{table_name}"),
        }
    }
}

#[async_trait]
impl WarehouseUploader for DuneUploader {
    async fn upload(&self, path: &Path, table_name: &str) -> Result<(), UploadError> {
        if !path.is_file() {
            return Err(UploadError::MissingFile(path.to_path_buf()));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| UploadError::Io {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let table = prepare_csv(path, &content)?;
        if table.rows == 0 {
            return Err(UploadError::EmptyTable(path.to_path_buf()));
        }

        tracing::info!(
            table = %self.qualified_name(table_name),
            rows = table.rows,
            columns = table.columns.len(),
            "Uploading table"
        );

        let request = CsvUploadRequest {
            table_name,
            data: &table.csv,
            description: format!("Extended exchange statistics: {table_name}"),
            is_private: self.is_private,
        };

        let response = self
            .http
            .post(format!("{}/table/upload/csv", self.api_url))
            .header("X-DUNE-API-KEY", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(UploadError::api(status.as_u16(), message));
        }

        tracing::info!(table = %self.qualified_name(table_name), "Upload complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: &str, key: Option<&str>) -> WarehouseConfig {
        WarehouseConfig {
            api_url: url.to_string(),
            api_key: key.map(str::to_string),
            is_private: false,
            namespace: Some("extended".into()),
        }
    }

    #[test]
    fn test_missing_api_key() {
        assert!(matches!(
            DuneUploader::new(&config("http://localhost", None)),
            Err(UploadError::Configuration(_))
        ));
        assert!(matches!(
            DuneUploader::new(&config("http://localhost", Some("  "))),
            Err(UploadError::Configuration(_))
        ));
    }

    #[test]
    fn test_qualified_name() {
        let uploader = DuneUploader::new(&config("http://localhost/", Some("k"))).unwrap();
        assert_eq!(
            uploader.qualified_name("extended_tvl_data"),
            "dune.extended.dataset_extended_tvl_data"
        );
    }

    #[tokio::test]
    async fn test_upload_posts_sanitized_csv() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/table/upload/csv"))
            .and(header("X-DUNE-API-KEY", "secret"))
            .and(body_partial_json(serde_json::json!({
                "table_name": "extended_tvl_data",
                "data": "collected_at,tvl_usd\n2025-01-01T00:00:00.000Z,1\n",
                "is_private": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("t.csv");
        fs::write(&file, "collected_at,tvl usd\n2025-01-01T00:00:00.000Z,1\n").unwrap();

        let uploader = DuneUploader::new(&config(&server.uri(), Some("secret"))).unwrap();
        uploader.upload(&file, "extended_tvl_data").await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "invalid API Key"})),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("t.csv");
        fs::write(&file, "a\n1\n").unwrap();

        let uploader = DuneUploader::new(&config(&server.uri(), Some("bad"))).unwrap();
        let err = uploader.upload(&file, "t").await.unwrap_err();

        match err {
            UploadError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid API Key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_missing_and_empty() {
        let dir = TempDir::new().unwrap();
        let uploader = DuneUploader::new(&config("http://127.0.0.1:9", Some("k"))).unwrap();

        let missing = uploader.upload(&dir.path().join("none.csv"), "t").await;
        assert!(matches!(missing, Err(UploadError::MissingFile(_))));

        let empty = dir.path().join("empty.csv");
        fs::write(&empty, "a,b\n").unwrap();
        assert!(matches!(
            uploader.upload(&empty, "t").await,
            Err(UploadError::EmptyTable(_))
        ));
    }
}
