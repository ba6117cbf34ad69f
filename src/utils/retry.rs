//! Retry utilities with exponential backoff for catalog API calls.

use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the attempt budget
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the first backoff delay
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay before the retry that follows attempt number `attempt` (1-based)
    fn delay_after(&self, attempt: u32) -> Duration {
        let exp = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powf(attempt.saturating_sub(1) as f64);
        Duration::from_secs_f64(exp.min(self.max_delay.as_secs_f64()))
    }
}

/// Whether an error is worth another attempt
pub fn is_transient(error: &SourceError) -> bool {
    match error {
        SourceError::Network(_) | SourceError::Timeout | SourceError::RateLimit => true,
        SourceError::Http(status) => *status >= 500,
        _ => false,
    }
}

/// Execute an async operation with retry logic
///
/// Transient errors are retried with exponential backoff until the attempt
/// budget runs out; permanent errors are returned immediately.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::debug!(attempts, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(error) if is_transient(&error) && attempts < config.max_attempts => {
                let delay = config.delay_after(attempts);
                tracing::debug!(attempts, ?delay, %error, "transient error, retrying");
                sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(attempts: u32) -> RetryConfig {
        RetryConfig::default()
            .max_attempts(attempts)
            .initial_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let calls = AtomicU32::new(0);

        let result = with_retry(fast_config(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, SourceError>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_transient_then_success() {
        let calls = AtomicU32::new(0);

        let result = with_retry(fast_config(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(SourceError::Http(503))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(fast_config(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::Parse("bad json".into())) }
        })
        .await;

        assert!(matches!(result, Err(SourceError::Parse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(fast_config(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::Timeout) }
        })
        .await;

        assert!(matches!(result, Err(SourceError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
            backoff_multiplier: 2.0,
        };
        assert_eq!(config.delay_after(1), Duration::from_secs(1));
        assert_eq!(config.delay_after(2), Duration::from_secs(2));
        assert_eq!(config.delay_after(5), Duration::from_secs(3));
    }
}
