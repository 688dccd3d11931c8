use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Retry configuration shared by the batch processor and the workflow
/// engine's task-level retry (`backon`-style exponential backoff with
/// jitter — the crate adds `backon`, already used by the sibling
/// `kpfromer-music-organizer` example for the same purpose).
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub retry_count: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Runs `op` up to `config.retry_count + 1` times. Only errors for
/// which `AppError::is_retriable` is true are retried; any other
/// error, or exhaustion of the retry budget, is returned immediately.
/// Logs a give-up event when the budget is exhausted.
pub async fn retry_with_backoff<F, Fut, T>(config: RetryConfig, operation_name: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retriable() && attempt < config.retry_count => {
                let delay = backoff_delay(config, attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if attempt >= config.retry_count {
                    tracing::warn!(operation = operation_name, attempts = attempt + 1, "retry budget exhausted, giving up");
                }
                return Err(err);
            }
        }
    }
}

fn backoff_delay(config: RetryConfig, attempt: u32) -> Duration {
    let exponential = config.base_delay.saturating_mul(1u32 << attempt.min(16));
    let capped = exponential.min(config.max_delay);
    let jitter_fraction: f64 = rand::thread_rng().gen_range(0.5..=1.0);
    Duration::from_secs_f64(capped.as_secs_f64() * jitter_fraction)
}

#[allow(dead_code)]
pub(crate) fn classify_retry(err: &AppError) -> bool {
    err.is_retriable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig {
            retry_count: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let result = retry_with_backoff(config, "test", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AppError::TransientExternal("boom".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig::default();
        let result: Result<()> = retry_with_backoff(config, "test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(AppError::PermanentExternal("nope".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
