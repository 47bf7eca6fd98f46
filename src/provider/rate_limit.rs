//! Request pacing for the disbursement provider

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Token bucket allowing one provider request per interval
///
/// Cloning shares the bucket, so every handle paces against the same budget.
#[derive(Clone)]
pub struct ProviderRateLimiter {
    limiter: Arc<GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    interval: Duration,
}

impl ProviderRateLimiter {
    /// Create a limiter releasing one request every `interval`
    ///
    /// A zero interval falls back to 500ms.
    pub fn new(interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            Duration::from_millis(500)
        } else {
            interval
        };
        let quota = Quota::with_period(interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::new(2).unwrap_or(NonZeroU32::MIN)));
        Self {
            limiter: Arc::new(GovRateLimiter::direct(quota)),
            interval,
        }
    }

    /// Limiter from a millisecond interval, as stored in configuration
    pub fn from_millis(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms))
    }

    /// Whether a request could be sent right now (consumes a token if so)
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait until the bucket releases a token
    pub async fn acquire(&self) {
        if self.limiter.check().is_err() {
            tracing::debug!(
                interval_ms = self.interval.as_millis() as u64,
                "pacing provider request"
            );
            self.limiter.until_ready().await;
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl std::fmt::Debug for ProviderRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRateLimiter")
            .field("interval", &self.interval)
            .finish()
    }
}
