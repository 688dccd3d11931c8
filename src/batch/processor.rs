use futures::stream::{self, StreamExt};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::batch::limiter::RateLimiter;
use crate::batch::retry::{retry_with_backoff, RetryConfig};
use crate::config::Config;
use crate::error::Result;

/// `{event_type, task_name, processed, total, ...}` progress event
/// (spec §4.C), invoked synchronously.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub event_type: &'static str,
    pub task_name: String,
    pub processed: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn to_json(&self) -> JsonValue {
        json!({
            "event_type": self.event_type,
            "task_name": self.task_name,
            "processed": self.processed,
            "total": self.total,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub concurrency_limit: usize,
    pub batch_size: usize,
    pub retry: RetryConfig,
}

impl BatchConfig {
    pub fn from_app_config(config: &Config) -> Self {
        Self {
            concurrency_limit: config.concurrency_limit,
            batch_size: config.batch_size,
            retry: RetryConfig {
                retry_count: config.retry_count,
                base_delay: config.retry_base_delay(),
                max_delay: config.retry_max_delay(),
            },
        }
    }
}

/// One result per input item. An item whose operation failed is
/// reported here rather than aborting the whole batch (spec §4.C
/// "error containment").
pub struct ItemResult<R> {
    pub value: Option<R>,
    pub error: Option<crate::error::AppError>,
}

/// Generic bounded-concurrency + rate-limited + retried batch
/// execution, shared by every connector and the matcher's API phase
/// (spec §4.C). Grounded on `original_source/narada/core/matcher.py`'s
/// `asyncio.Semaphore(concurrency)` usage, reproduced with
/// `tokio::sync::Semaphore`.
pub struct BatchProcessor {
    config: BatchConfig,
    limiter: Option<RateLimiter>,
}

impl BatchProcessor {
    pub fn new(config: BatchConfig, limiter: Option<RateLimiter>) -> Self {
        Self { config, limiter }
    }

    /// Processes `items` in chunks of `batch_size`, each chunk under a
    /// semaphore of `concurrency_limit`, with per-item retry and a
    /// synchronous progress callback. Results preserve input order
    /// within each chunk; error on one item does not abort the batch.
    pub async fn process<T, R, F, Fut>(
        &self,
        task_name: &str,
        items: Vec<T>,
        op: F,
        mut on_progress: Option<&mut dyn FnMut(ProgressEvent)>,
    ) -> Vec<ItemResult<R>>
    where
        T: Clone + Send + Sync,
        R: Send,
        F: Fn(T) -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<R>> + Send,
    {
        let total = items.len();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency_limit.max(1)));
        let mut results = Vec::with_capacity(total);
        let mut processed = 0usize;
        let mut remaining = items;

        while !remaining.is_empty() {
            let split_at = self.config.batch_size.max(1).min(remaining.len());
            let chunk: Vec<T> = remaining.drain(..split_at).collect();

            let chunk_results = stream::iter(chunk.into_iter().map(|item| {
                let semaphore = Arc::clone(&semaphore);
                let limiter = self.limiter.clone();
                let retry_config = self.config.retry;
                let op = &op;
                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore is never closed");
                    retry_with_backoff(retry_config, task_name, || {
                        let item = item.clone();
                        let limiter = limiter.clone();
                        async move {
                            if let Some(limiter) = &limiter {
                                limiter.acquire().await;
                            }
                            op(item).await
                        }
                    })
                    .await
                }
            }))
            .buffered(self.config.concurrency_limit.max(1))
            .collect::<Vec<_>>()
            .await;

            for result in chunk_results {
                processed += 1;
                if let Some(on_progress) = on_progress.as_deref_mut() {
                    on_progress(ProgressEvent {
                        event_type: "item_completed",
                        task_name: task_name.to_string(),
                        processed,
                        total,
                    });
                }
                match result {
                    Ok(value) => results.push(ItemResult { value: Some(value), error: None }),
                    Err(err) => results.push(ItemResult { value: None, error: Some(err) }),
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn error_on_one_item_does_not_abort_the_batch() {
        let processor = BatchProcessor::new(
            BatchConfig {
                concurrency_limit: 2,
                batch_size: 10,
                retry: RetryConfig { retry_count: 0, ..Default::default() },
            },
            None,
        );
        let items = vec![1, 2, 3];
        let results = processor
            .process("test", items, |n| async move {
                if n == 2 {
                    Err(crate::error::AppError::validation("bad item"))
                } else {
                    Ok(n * 10)
                }
            }, None)
            .await;
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.error.is_some()).count(), 1);
    }

    #[tokio::test]
    async fn progress_callback_fires_once_per_item() {
        let processor = BatchProcessor::new(
            BatchConfig {
                concurrency_limit: 4,
                batch_size: 2,
                retry: RetryConfig::default(),
            },
            None,
        );
        let counter = AtomicUsize::new(0);
        let mut on_progress = |_event: ProgressEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        };
        let _ = processor
            .process("test", vec![1, 2, 3, 4, 5], |n| async move { Ok::<_, crate::error::AppError>(n) }, Some(&mut on_progress))
            .await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }
}
