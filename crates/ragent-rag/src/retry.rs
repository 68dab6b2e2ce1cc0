//! Bounded exponential backoff for retryable provider failures.
//!
//! Only errors that report `is_retryable()` (rate limits, transient
//! unavailability) are retried; everything else is returned immediately.

use ragent_core::{RagentError, Result, RetrievalConfig};
use std::future::Future;
use std::time::Duration;

/// Retry policy with exponentially growing backoff
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    attempts: u32,

    /// Backoff before the first retry; doubles on each subsequent retry
    initial_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy, validating `attempts >= 1`
    pub fn new(attempts: u32, initial_backoff: Duration) -> Result<Self> {
        if attempts == 0 {
            return Err(RagentError::InvalidParameter(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            attempts,
            initial_backoff,
        })
    }

    /// Create a policy from retrieval config values
    pub fn from_config(config: &RetrievalConfig) -> Result<Self> {
        Self::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_initial_backoff_ms),
        )
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or all attempts are exhausted (the last error is returned).
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.initial_backoff;

        for attempt in 1..=self.attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "{what} failed transiently, retrying: {err}"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => return Err(err),
            }
        }

        unreachable!("loop returns on the final attempt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(200)).unwrap()
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(RetryPolicy::new(0, Duration::from_millis(1)).is_err());
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = policy(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            })
            .await
            .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_rate_limited_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = policy(3)
            .run("op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RagentError::RateLimited("slow down".to_string()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_budget_exhausted() {
        let calls = AtomicU32::new(0);
        let err = policy(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(RagentError::ServiceUnavailable("down".to_string())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RagentError::ServiceUnavailable(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_fast() {
        let calls = AtomicU32::new(0);
        let err = policy(3)
            .run("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(RagentError::EmbeddingFailed("bad input".to_string())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RagentError::EmbeddingFailed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
