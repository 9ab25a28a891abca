//! Error types for collection.
//!
//! [`FetchError`] describes a single failed HTTP attempt. [`CollectorError`]
//! is what a component reports once retries are exhausted or a payload or
//! table turns out to be unusable.

use extended_data::{StoreError, Stream};
use std::path::PathBuf;
use thiserror::Error;

/// Maximum response body length kept in a status error.
const MAX_BODY_LEN: usize = 512;

/// One failed request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection or transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Body was not valid JSON.
    #[error("invalid JSON body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Creates a status error, truncating long bodies.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > MAX_BODY_LEN {
            let mut end = MAX_BODY_LEN;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
            body.push_str("...");
        }
        Self::Status { status, body }
    }

    /// Returns true if repeating the request may succeed.
    ///
    /// Every non-2xx status counts, not only 5xx.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Failures surfaced by collection components.
///
/// None of these abort a run; the orchestrator contains each one to the
/// stream (or chain) it happened in.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Endpoint kept failing until the retry budget ran out.
    #[error("{url} failed after {attempts} attempt(s): {source}")]
    TransientNetwork {
        url: String,
        attempts: u32,
        #[source]
        source: FetchError,
    },

    /// Payload did not have any recognised shape.
    #[error("malformed {stream} response: {reason}")]
    MalformedResponse { stream: Stream, reason: String },

    /// Existing table could not be parsed; the store rebuilt it.
    #[error("table {path} unreadable: {reason}")]
    StorageCorruption { path: PathBuf, reason: String },

    /// Missing or unusable setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unexpected failure (filesystem, ...).
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CollectorError {
    /// Creates a malformed response error.
    pub fn malformed(stream: Stream, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            stream,
            reason: reason.into(),
        }
    }

    /// Returns true for the failure kinds expected during normal operation.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork { .. }
                | Self::MalformedResponse { .. }
                | Self::StorageCorruption { .. }
        )
    }
}

impl From<StoreError> for CollectorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corrupt { path, reason } => Self::StorageCorruption { path, reason },
            other => Self::Storage(anyhow::Error::new(other)),
        }
    }
}
