//! Upload error types.

use std::path::PathBuf;
use thiserror::Error;

/// Failures uploading one table.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Missing API key or unusable setting. Fatal to uploading only.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Table file does not exist.
    #[error("file not found: {0}")]
    MissingFile(PathBuf),

    /// Table file has a header but no rows.
    #[error("table {0} has no rows")]
    EmptyTable(PathBuf),

    /// Warehouse rejected the upload.
    #[error("warehouse API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Reading or re-encoding the file failed.
    #[error("I/O error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

impl UploadError {
    /// Creates an API error from status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the table was not uploaded because there was nothing
    /// to upload.
    #[must_use]
    pub fn is_nothing_to_upload(&self) -> bool {
        matches!(self, Self::MissingFile(_) | Self::EmptyTable(_))
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("timeout: {err}"))
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = UploadError::api(401, "invalid API key");
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("invalid API key"));
        assert!(!err.is_nothing_to_upload());
    }

    #[test]
    fn test_nothing_to_upload() {
        assert!(UploadError::MissingFile(PathBuf::from("a.csv")).is_nothing_to_upload());
        assert!(UploadError::EmptyTable(PathBuf::from("a.csv")).is_nothing_to_upload());
        assert!(!UploadError::Configuration("x".into()).is_nothing_to_upload());
    }
}
