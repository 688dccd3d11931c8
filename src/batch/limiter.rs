use governor::{clock::DefaultClock, state::direct::NotKeyed, state::InMemoryState, Quota, RateLimiter as GovernorLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Shared token-bucket limiter wrapping every outbound call for one
/// connector (grounded on the teacher's `services/spotify.rs`
/// `governor::RateLimiter` usage). One instance per connector,
/// process-wide, held in an `Arc`.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn per_second(calls_per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(calls_per_second.max(1)).expect("clamped to at least 1"));
        Self {
            inner: Arc::new(GovernorLimiter::direct(quota)),
        }
    }

    /// Blocks until a call is permitted. Every outbound connector call
    /// is bracketed by exactly one acquisition (spec §8's testable
    /// property).
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }
}
