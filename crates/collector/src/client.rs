//! Rate-limited JSON GET client with retry.
//!
//! One client is shared by every stream of a run. Each attempt waits for the
//! governor rate limiter, so retries count against the same budget as
//! first attempts.

use crate::error::{CollectorError, FetchError};
use crate::retry::{retry_with_backoff, BackoffPolicy};
use extended_core::HttpConfig;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP fetch client for the exchange and TVL endpoints.
pub struct FetchClient {
    /// HTTP client (carries the request timeout)
    http: Client,
    /// Requests per second across all endpoints
    rate_limiter: DirectRateLimiter,
    /// Retry policy applied to every request
    policy: BackoffPolicy,
}

impl FetchClient {
    /// Builds a client from the HTTP section of the configuration.
    ///
    /// # Errors
    /// Returns [`CollectorError::Configuration`] if the rate is zero or the
    /// TLS backend cannot be initialised.
    pub fn new(config: &HttpConfig) -> Result<Self, CollectorError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("extended-stats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CollectorError::Configuration(format!("HTTP client: {e}")))?;

        let rate = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            CollectorError::Configuration("http.requests_per_second must be > 0".into())
        })?;

        Ok(Self {
            http,
            rate_limiter: RateLimiter::direct(Quota::per_second(rate)),
            policy: BackoffPolicy::from_config(config),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// GETs `url` with `query` and returns the parsed JSON body.
    ///
    /// Network failures, timeouts and non-2xx statuses are retried with
    /// exponential backoff. A body that is not JSON is not retried.
    ///
    /// # Errors
    /// [`CollectorError::TransientNetwork`] carrying the last cause and the
    /// number of attempts made.
    pub async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, CollectorError> {
        retry_with_backoff(&self.policy, move |attempt| {
            tracing::debug!(url, attempt, "GET");
            self.get_once(url, query)
        })
        .await
        .map_err(|exhausted| CollectorError::TransientNetwork {
            url: url.to_string(),
            attempts: exhausted.attempts,
            source: exhausted.error,
        })
    }

    /// A single attempt.
    async fn get_once(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .http
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::status(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
