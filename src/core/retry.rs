// src/core/retry.rs
//! Bounded timeout plus a fixed number of retries for external calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{Result, SpecError};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    /// Attempts after the first one
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(timeout_secs: u64, retries: u32) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            retries,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Run `call` until it succeeds or the attempts run out; each attempt is
/// cut off at the policy timeout. The last error is returned.
pub async fn with_retry<T, F, Fut>(operation: &str, policy: RetryPolicy, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.retries + 1;
    let mut attempt = 1;

    loop {
        let outcome = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(SpecError::Timeout {
                operation: operation.to_string(),
                seconds: policy.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && is_retryable(&e) => {
                warn!("{} failed (attempt {}/{}): {}", operation, attempt, attempts, e);
                attempt += 1;
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Configuration problems will not fix themselves on a second try
fn is_retryable(error: &SpecError) -> bool {
    !matches!(error, SpecError::Config(_) | SpecError::MissingInput(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(retries: u32) -> RetryPolicy {
        RetryPolicy::new(1, retries).with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = with_retry("flaky", fast(2), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(SpecError::Generation("boom".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = with_retry("broken", fast(1), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SpecError::Export("down".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(SpecError::Export(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_config_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = with_retry("misconfigured", fast(3), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SpecError::Config("no key".into()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let policy = RetryPolicy {
            timeout: Duration::from_millis(20),
            retries: 0,
            backoff: Duration::from_millis(1),
        };
        let result: Result<()> = with_retry("slow", policy, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(SpecError::Timeout { ref operation, .. }) if operation == "slow"));
    }
}
