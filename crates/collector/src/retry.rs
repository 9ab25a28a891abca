//! Bounded retry with exponential backoff.
//!
//! The retry loop knows nothing about HTTP: it drives any
//! `attempt(n) -> Result<T, E>` future factory and consults
//! [`Retryable::is_transient`] to decide whether to go again.

use crate::error::FetchError;
use extended_core::HttpConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Errors that know whether another attempt could help.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

impl Retryable for FetchError {
    fn is_transient(&self) -> bool {
        FetchError::is_transient(self)
    }
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl BackoffPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn from_config(http: &HttpConfig) -> Self {
        Self::new(http.max_attempts, http.base_delay()).with_max_delay(http.max_delay())
    }

    /// Sets the upper bound for a single delay.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the failed attempt number `attempt` (1-based).
    ///
    /// `base, 2*base, 4*base, ...` capped at `max_delay`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// The last error once no further attempt will be made.
#[derive(Debug)]
pub struct Exhausted<E> {
    /// Attempts actually made
    pub attempts: u32,
    pub error: E,
}

/// Runs `attempt(1)`, `attempt(2)`, ... until one succeeds, a non-transient
/// error occurs, or the policy's attempt budget is spent.
///
/// # Errors
/// Returns the last error together with the number of attempts made.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &BackoffPolicy,
    mut attempt: F,
) -> Result<T, Exhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(error) if !error.is_transient() || n >= policy.max_attempts() => {
                return Err(Exhausted { attempts: n, error });
            }
            Err(error) => {
                let delay = policy.delay_after(n);
                tracing::warn!(
                    attempt = n,
                    max_attempts = policy.max_attempts(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Attempt failed, retrying: {}",
                    error
                );
                tokio::time::sleep(delay).await;
                n += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_delay_doubles() {
        let policy = BackoffPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped() {
        let policy = BackoffPolicy::new(50, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.delay_after(10), Duration::from_secs(5));
        assert_eq!(policy.delay_after(40), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(BackoffPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn test_from_config() {
        let http = extended_core::AppConfig::default().http;
        let policy = BackoffPolicy::from_config(&http);
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let policy = BackoffPolicy::new(3, Duration::from_millis(1));
        let calls = Cell::new(0);

        let result = retry_with_backoff(&policy, |n| {
            calls.set(calls.get() + 1);
            async move {
                if n < 3 {
                    Err(FetchError::status(503, "busy"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let policy = BackoffPolicy::new(3, Duration::from_millis(1));
        let calls = Cell::new(0);

        let result: Result<(), _> = retry_with_backoff(&policy, |_| {
            calls.set(calls.get() + 1);
            async { Err(FetchError::status(500, "down")) }
        })
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert!(matches!(exhausted.error, FetchError::Status { status: 500, .. }));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_non_transient_not_retried() {
        let policy = BackoffPolicy::new(5, Duration::from_millis(1));
        let calls = Cell::new(0);

        let result: Result<(), _> = retry_with_backoff(&policy, |_| {
            calls.set(calls.get() + 1);
            async { Err(FetchError::Decode("not json".into())) }
        })
        .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.get(), 1);
    }
}
