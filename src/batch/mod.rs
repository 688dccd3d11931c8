pub mod limiter;
pub mod processor;
pub mod retry;

pub use limiter::RateLimiter;
pub use processor::{BatchConfig, BatchProcessor, ItemResult, ProgressEvent};
pub use retry::{retry_with_backoff, RetryConfig};
