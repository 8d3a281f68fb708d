//! Process-wide token-bucket rate limiter.
//!
//! Tile servers publish requests-per-second policies; a single limiter is
//! shared by every concurrent fetch worker so the aggregate request rate
//! stays bounded regardless of worker count. The bucket math lives in a
//! pure [`poll_acquire`](RateLimiter::poll_acquire) step so tests can drive
//! it with a simulated clock.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::FetchError;

/// Thread-safe token bucket: `rate` tokens per second, up to `burst` held.
pub struct RateLimiter {
    state: Mutex<BucketState>,
    rate: f64,
    burst: f64,
}

struct BucketState {
    tokens: f64,
    refreshed: Instant,
}

impl RateLimiter {
    /// Creates a limiter granting `requests_per_second` tokens with the
    /// given burst allowance. The bucket starts full.
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        let rate = requests_per_second.max(f64::MIN_POSITIVE);
        let burst = f64::from(burst.max(1));
        Self {
            state: Mutex::new(BucketState {
                tokens: burst,
                refreshed: Instant::now(),
            }),
            rate,
            burst,
        }
    }

    /// One bucket step at time `now`: either a token is granted, or the
    /// duration until the next token becomes available is returned.
    ///
    /// The lock covers only the bucket arithmetic, never any waiting.
    pub(crate) fn poll_acquire(&self, now: Instant) -> Result<(), Duration> {
        let mut state = self.state.lock();
        let elapsed = now.saturating_duration_since(state.refreshed).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
        state.refreshed = now;
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - state.tokens) / self.rate))
        }
    }

    /// Waits until a token is available, honoring cancellation while
    /// sleeping.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), FetchError> {
        loop {
            match self.poll_acquire(Instant::now()) {
                Ok(()) => return Ok(()),
                Err(wait) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_grants_immediately() {
        let limiter = RateLimiter::new(1.0, 3);
        let now = Instant::now();
        assert!(limiter.poll_acquire(now).is_ok());
        assert!(limiter.poll_acquire(now).is_ok());
        assert!(limiter.poll_acquire(now).is_ok());
        // Bucket drained: the fourth request must wait.
        assert!(limiter.poll_acquire(now).is_err());
    }

    #[test]
    fn test_tokens_refill_over_time() {
        let limiter = RateLimiter::new(2.0, 1);
        let t0 = Instant::now();
        assert!(limiter.poll_acquire(t0).is_ok());
        assert!(limiter.poll_acquire(t0).is_err());
        // Half a second later one token (rate 2/s) has refilled.
        assert!(limiter.poll_acquire(t0 + Duration::from_millis(500)).is_ok());
    }

    #[test]
    fn test_wait_hint_matches_rate() {
        let limiter = RateLimiter::new(4.0, 1);
        let t0 = Instant::now();
        assert!(limiter.poll_acquire(t0).is_ok());
        let wait = limiter.poll_acquire(t0).unwrap_err();
        // One token at 4/s arrives in 250ms.
        assert!((wait.as_secs_f64() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_refill_caps_at_burst() {
        let limiter = RateLimiter::new(10.0, 2);
        let t0 = Instant::now();
        // A long idle period must not accumulate more than `burst` tokens.
        let later = t0 + Duration::from_secs(60);
        assert!(limiter.poll_acquire(later).is_ok());
        assert!(limiter.poll_acquire(later).is_ok());
        assert!(limiter.poll_acquire(later).is_err());
    }

    #[tokio::test]
    async fn test_acquire_cancelled() {
        let limiter = RateLimiter::new(0.001, 1);
        let cancel = CancellationToken::new();
        // Drain the single token, then cancel during the (very long) wait.
        assert!(limiter.acquire(&cancel).await.is_ok());
        cancel.cancel();
        let result = limiter.acquire(&cancel).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Over any simulated interval, grants never exceed
            /// rate * elapsed + burst.
            #[test]
            fn test_grants_bounded_by_rate(
                rate_tenths in 1u32..100,
                burst in 1u32..10,
                steps in proptest::collection::vec(0u64..500, 1..200)
            ) {
                let rate = f64::from(rate_tenths) / 10.0;
                let limiter = RateLimiter::new(rate, burst);
                let t0 = Instant::now();

                let mut now = t0;
                let mut granted: u64 = 0;
                for step_ms in steps {
                    now += Duration::from_millis(step_ms);
                    if limiter.poll_acquire(now).is_ok() {
                        granted += 1;
                    }
                }

                let elapsed = (now - t0).as_secs_f64();
                let bound = rate * elapsed + f64::from(burst);
                prop_assert!(
                    (granted as f64) <= bound + 1e-6,
                    "granted {} exceeds bound {} over {}s",
                    granted, bound, elapsed
                );
            }
        }
    }
}
