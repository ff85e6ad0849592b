//! Retry strategy with exponential backoff for transient errors.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use artfolio_common::{Error, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of invocations, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_factor: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl RetryConfig {
    /// Create a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(1000),
            backoff_factor: 1.5,
            jitter: true,
        }
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate the delay after a given zero-based attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);

        let delayed = if self.jitter {
            // Uniform jitter in [0.85, 1.15].
            let jitter_factor = 0.85 + (rand::random::<f64>() * 0.3);
            base * jitter_factor
        } else {
            base
        };

        Duration::from_millis(delayed as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Retry executor for running operations with retry logic.
///
/// Purely a control wrapper: no side effects beyond the wrapped operation's
/// own. Wrapping non-idempotent operations is only safe when the caller
/// accepts at-least-once semantics.
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute an operation with retry logic.
    ///
    /// Terminal errors abort immediately and surface unchanged. Transient
    /// errors are retried up to `max_attempts` total invocations; exhaustion
    /// surfaces [`Error::RetriesExhausted`] carrying the attempt count and
    /// the last underlying error.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<Error> = None;

        for attempt in 0..max_attempts {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Operation succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(result);
                }
                Err(err) if err.is_terminal() => {
                    warn!("Non-retriable error on attempt {}: {}", attempt + 1, err);
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        "Attempt {}/{} failed: {}",
                        attempt + 1,
                        max_attempts,
                        err
                    );
                    last_error = Some(err);

                    // Don't wait after the last attempt.
                    if attempt + 1 < max_attempts {
                        let delay = self.config.delay_for_attempt(attempt);
                        debug!("Retrying in {:?}", delay);
                        sleep(delay).await;
                    }
                }
            }
        }

        let source = last_error.unwrap_or_else(|| {
            Error::Network("operation produced no result".to_string())
        });
        Err(Error::RetriesExhausted {
            attempts: max_attempts,
            source: Box::new(source),
        })
    }

    /// Execute with retry under an overall deadline.
    ///
    /// The deadline covers the whole retry sequence. Elapsing maps to a
    /// transient [`Error::Timeout`]: cancellation is handled exactly like
    /// exhaustion, not as a distinct error class.
    pub async fn execute_timed<F, Fut, T>(&self, overall: Duration, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(overall, self.execute(operation)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Operation canceled after {:?}", overall);
                Err(Error::Timeout(format!(
                    "operation canceled after {:?}",
                    overall
                )))
            }
        }
    }

    /// Get the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Convenience function for simple retry with defaults.
pub async fn retry<F, Fut, T>(operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    RetryExecutor::default().execute(operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_delay_calculation_without_jitter() {
        let config = RetryConfig::new(3)
            .with_base_delay(Duration::from_millis(1000))
            .with_backoff_factor(1.5)
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1500));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2250));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let config = RetryConfig::new(3)
            .with_base_delay(Duration::from_millis(1000))
            .with_backoff_factor(1.0);

        for _ in 0..100 {
            let delay = config.delay_for_attempt(0).as_millis();
            assert!((850..=1150).contains(&delay), "delay {} out of bounds", delay);
        }
    }

    #[tokio::test]
    async fn test_successful_operation() {
        let executor = RetryExecutor::default();

        let result: Result<i32> = executor.execute(|| async { Ok(42) }).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_on_transient_error() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let count_clone = attempt_count.clone();

        let config = RetryConfig::new(3)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false);
        let executor = RetryExecutor::new(config);

        let result: Result<i32> = executor
            .execute(move || {
                let count = count_clone.clone();
                async move {
                    let current = count.fetch_add(1, Ordering::SeqCst);
                    if current < 2 {
                        Err(Error::Network("connection failed".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_failure_calls_exactly_max_attempts() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let count_clone = attempt_count.clone();

        let config = RetryConfig::new(3).with_base_delay(Duration::from_millis(1));
        let executor = RetryExecutor::new(config);

        let result: Result<i32> = executor
            .execute(move || {
                let count = count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(Error::Network("always fails".to_string()))
                }
            })
            .await;

        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            Error::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(source.to_string().contains("always fails"));
            }
            other => panic!("expected RetriesExhausted, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_terminal_error_short_circuits() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let count_clone = attempt_count.clone();

        let executor = RetryExecutor::default();

        let result: Result<i32> = executor
            .execute(move || {
                let count = count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(Error::NotFound("artwork not found".to_string()))
                }
            })
            .await;

        // NotFound is terminal: exactly one call, error surfaced unchanged.
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deadline_maps_to_timeout() {
        let config = RetryConfig::new(3).with_base_delay(Duration::from_millis(1));
        let executor = RetryExecutor::new(config);

        let result: Result<i32> = executor
            .execute_timed(Duration::from_millis(20), || async {
                sleep(Duration::from_secs(5)).await;
                Ok(1)
            })
            .await;

        assert!(matches!(result.unwrap_err(), Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_convenience_retry_function() {
        let result: Result<String> = retry(|| async { Ok("success".to_string()) }).await;
        assert_eq!(result.unwrap(), "success");
    }
}
