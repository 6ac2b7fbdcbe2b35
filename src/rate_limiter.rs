//! Request admission using a token bucket
//!
//! One [`RateLimiter`] is shared by every job in the process, so the total
//! request rate against the remote source stays bounded no matter how many
//! jobs run at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RateLimitConfig;
use crate::error::{Error, Result};

/// Tokens are tracked in thousandths so slow refills are not rounded away
const SCALE: u64 = 1_000;

/// Process-wide request limiter
///
/// Tokens represent remote requests. They refill at `requests_per_second`
/// up to `burst`, and every remote call takes one before it is issued.
/// A rate of 0 disables limiting.
///
/// Cloning is cheap and clones share the same bucket.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    /// Requests per second (0 = unlimited)
    rate: u64,
    /// Bucket capacity in requests
    burst: u64,
    /// Available tokens, scaled by [`SCALE`]
    tokens: Arc<AtomicU64>,
    /// Last refill, in nanoseconds since `origin`
    last_refill: Arc<AtomicU64>,
    origin: Instant,
}

impl RateLimiter {
    /// Create a limiter with a full bucket
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = config.burst.max(1);
        Self {
            rate: config.requests_per_second,
            burst,
            tokens: Arc::new(AtomicU64::new(burst * SCALE)),
            last_refill: Arc::new(AtomicU64::new(0)),
            origin: Instant::now(),
        }
    }

    /// A limiter that never waits
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(&RateLimitConfig {
            requests_per_second: 0,
            burst: 1,
        })
    }

    /// Current rate, or `None` when unlimited
    pub fn rate(&self) -> Option<u64> {
        match self.rate {
            0 => None,
            rate => Some(rate),
        }
    }

    /// Take one token, waiting for a refill if the bucket is empty.
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires before a token is
    /// granted; no token is consumed in that case.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let rate = self.rate;
            if rate == 0 {
                return Ok(());
            }

            self.refill_tokens(rate);

            let current = self.tokens.load(Ordering::SeqCst);
            if current >= SCALE {
                if self
                    .tokens
                    .compare_exchange(current, current - SCALE, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    return Ok(());
                }
                // Lost the race to another task
                continue;
            }

            let missing = SCALE - current;
            let wait_ms = missing * 1_000 / (rate * SCALE);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(Duration::from_millis(wait_ms.clamp(10, 100))) => {}
            }
        }
    }

    /// Add tokens for the time elapsed since the last refill, capped at `burst`
    fn refill_tokens(&self, rate: u64) {
        let now = self.now_nanos();
        let last = self.last_refill.load(Ordering::SeqCst);

        let elapsed_nanos = now.saturating_sub(last);
        let tokens_to_add = (u128::from(elapsed_nanos) * u128::from(rate) * u128::from(SCALE)
            / 1_000_000_000) as u64;

        if tokens_to_add > 0
            && self
                .last_refill
                .compare_exchange(last, now, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            let capacity = self.burst * SCALE;
            let _ = self
                .tokens
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                    Some(current.saturating_add(tokens_to_add).min(capacity))
                });
        }
    }

    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    #[cfg(test)]
    fn available(&self) -> u64 {
        self.tokens.load(Ordering::SeqCst) / SCALE
    }
}
