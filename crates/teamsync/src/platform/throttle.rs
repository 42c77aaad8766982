use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default delays for the pacing strategies.
pub mod delays {
    /// Pause between mutating calls. GitHub asks integrations to wait at
    /// least a second between writes; half a second has proven enough for
    /// the bursty, low-volume runs this tool does.
    pub const DEFAULT_DELAY_MS: u64 = 500;
    /// Upper bound the adaptive strategy backs off to.
    pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
}

/// Pacing strategy applied between state-mutating remote calls.
///
/// `pause` is awaited after every mutation and between assignments; the
/// caller makes no further remote call until it returns. Implementations
/// are shared behind an `Arc` and must tolerate concurrent callers, so the
/// aggregate request rate stays bounded even if work is ever spread across
/// tasks.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Wait until the next mutating call may proceed.
    async fn pause(&self);

    /// Tell the strategy the platform rejected a call for exceeding its
    /// rate limit. `retry_after` carries the platform's hint when it sent one.
    fn on_rate_limited(&self, retry_after: Option<Duration>) {
        let _ = retry_after;
    }
}

/// Shared, type-erased throttle handle.
pub type SharedThrottle = Arc<dyn Throttle>;

/// Constant delay, the historical behaviour.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(delays::DEFAULT_DELAY_MS))
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

/// Delay that grows on rate-limit signals and relaxes back to its base.
///
/// Each signal doubles the current delay (or jumps straight to the
/// platform's `retry_after`, whichever is longer), capped at `max`. Every
/// pause that follows without a new signal halves the delay again until it
/// reaches `base`.
#[derive(Debug)]
pub struct AdaptiveDelay {
    base: Duration,
    max: Duration,
    current: Mutex<Duration>,
}

impl AdaptiveDelay {
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: Mutex::new(base),
        }
    }

    /// The delay the next pause will use.
    pub fn current_delay(&self) -> Duration {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for AdaptiveDelay {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(delays::DEFAULT_DELAY_MS),
            Duration::from_millis(delays::DEFAULT_MAX_DELAY_MS),
        )
    }
}

#[async_trait]
impl Throttle for AdaptiveDelay {
    async fn pause(&self) {
        let delay = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            let delay = *current;
            *current = (delay / 2).max(self.base);
            delay
        };
        tokio::time::sleep(delay).await;
    }

    fn on_rate_limited(&self, retry_after: Option<Duration>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let doubled = current.saturating_mul(2).max(self.base);
        let next = retry_after.map_or(doubled, |hint| doubled.max(hint));
        *current = next.min(self.max);
        tracing::debug!(delay_ms = current.as_millis() as u64, "Backing off after rate limit");
    }
}

/// Token-bucket limiter using the governor crate.
///
/// Allows short bursts up to `requests_per_second` and then paces callers.
#[derive(Clone)]
pub struct RequestRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl RequestRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// Zero is treated as one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
        }
    }
}

#[async_trait]
impl Throttle for RequestRateLimiter {
    async fn pause(&self) {
        self.inner.until_ready().await;
    }
}

/// No pacing at all. Used for dry runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Throttle for NoDelay {
    async fn pause(&self) {}
}
