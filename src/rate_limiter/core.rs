//! # Token Bucket
//!
//! Continuous-refill token bucket for a single client identity.
//!
//! ```text
//!     capacity = 5, per = 5s  (1 token/s)
//!
//!     t=0.0   [●●●●●]  5.0   fresh bucket starts full
//!     t=0.0   [●●●●○]  4.0   check ✅
//!     t=0.0   [○○○○○]  0.0   four more checks ✅
//!     t=0.0   [○○○○○]  0.0   check ❌
//!     t=0.5   [◐○○○○]  0.5   check ❌ (refill applied, still < 1)
//!     t=1.0   [○○○○○]  0.0   check ✅ (0.5 + 0.5 = 1.0, consumed)
//! ```
//!
//! Refill is computed lazily on each committing check from the time elapsed
//! since the previous committing check, then clamped to `capacity`. There is
//! no background task.
//!
//! ## Probes
//!
//! `check(false)` answers "would a request be admitted right now?" without
//! committing anything: it evaluates the refill on a copy of the state and
//! neither stores tokens nor advances the refill clock. Repeated probes
//! therefore never change the outcome of the next committing check. This
//! departs from storing the probe's refill, which would let probes compound
//! refill and inflate the bucket.
//!
//! ## Concurrency
//!
//! State lives behind a `parking_lot::Mutex`. The clock is read while the
//! lock is held, so `last_refill` only ever moves forward and two racing
//! checks cannot both spend the same token.

use super::{
    clock::{Clock, MonotonicClock},
    config::RateLimiterConfig,
    error::ConfigResult,
};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Cost of one admitted request.
const TOKEN_COST: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    /// Credits the tokens accrued since `last_refill`, clamped to `capacity`.
    #[inline]
    fn refill(&mut self, now: Instant, fill_rate: f64, capacity: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens += elapsed.as_secs_f64() * fill_rate;
        if self.tokens > capacity {
            self.tokens = capacity;
        }
    }
}

/// Token bucket admitting at most `capacity` requests per `refill_period`.
///
/// # Example
///
/// ```rust
/// use qrgate::{ManualClock, TokenBucket};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = Arc::new(ManualClock::new());
/// let bucket = TokenBucket::with_clock(2.0, Duration::from_secs(2), clock.clone()).unwrap();
///
/// assert!(bucket.check(true));
/// assert!(bucket.check(true));
/// assert!(!bucket.check(true));
///
/// clock.advance(Duration::from_secs(1));
/// assert!(bucket.check(true));
/// ```
pub struct TokenBucket<C = MonotonicClock> {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_period: Duration,
    /// Tokens per second, `capacity / refill_period`.
    fill_rate: f64,
    clock: C,
}

impl TokenBucket<MonotonicClock> {
    /// Creates a full bucket driven by the process monotonic clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](super::ConfigError) if `capacity` is not
    /// positive or `refill_period` is zero.
    pub fn new(capacity: f64, refill_period: Duration) -> ConfigResult<Self> {
        Self::with_clock(capacity, refill_period, MonotonicClock)
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Creates a full bucket driven by `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`TokenBucket::new`].
    pub fn with_clock(capacity: f64, refill_period: Duration, clock: C) -> ConfigResult<Self> {
        let config = RateLimiterConfig::new(capacity, refill_period);
        config.validate()?;
        Ok(Self::from_config(&config, clock))
    }

    /// Builds a bucket from an already validated configuration.
    pub(crate) fn from_config(config: &RateLimiterConfig, clock: C) -> Self {
        debug_assert!(config.validate().is_ok());
        let now = clock.now();
        Self {
            state: Mutex::new(BucketState {
                tokens: config.rate,
                last_refill: now,
            }),
            capacity: config.rate,
            refill_period: config.per,
            fill_rate: config.tokens_per_second(),
            clock,
        }
    }

    /// Decides whether a request is admitted now.
    ///
    /// With `consume == true` the refill is committed, the refill clock moves
    /// to now and, if admitted, one token is spent. With `consume == false`
    /// the same decision is computed but nothing is stored.
    ///
    /// Never fails and never blocks beyond the per-bucket lock.
    pub fn check(&self, consume: bool) -> bool {
        let mut state = self.state.lock();
        let now = self.clock.now();

        if !consume {
            let mut probe = *state;
            probe.refill(now, self.fill_rate, self.capacity);
            return probe.tokens >= TOKEN_COST;
        }

        state.refill(now, self.fill_rate, self.capacity);
        state.last_refill = now;

        if state.tokens < TOKEN_COST {
            return false;
        }
        state.tokens -= TOKEN_COST;
        true
    }

    /// Maximum number of tokens.
    #[inline]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Time for an empty bucket to refill completely.
    #[inline]
    pub fn refill_period(&self) -> Duration {
        self.refill_period
    }

    /// Stored token count as of the last committing check.
    ///
    /// Does not apply pending refill.
    pub fn tokens(&self) -> f64 {
        self.state.lock().tokens
    }

    /// Instant of the last committing check, or creation.
    pub fn last_refill(&self) -> Instant {
        self.state.lock().last_refill
    }
}

impl<C> std::fmt::Debug for TokenBucket<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("capacity", &self.capacity)
            .field("refill_period", &self.refill_period)
            .field("tokens", &self.state.lock().tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::{clock::ManualClock, error::ConfigError};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn bucket(capacity: f64, per_secs: u64) -> (Arc<ManualClock>, TokenBucket<Arc<ManualClock>>) {
        let clock = Arc::new(ManualClock::new());
        let bucket =
            TokenBucket::with_clock(capacity, Duration::from_secs(per_secs), clock.clone()).unwrap();
        (clock, bucket)
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert_eq!(
            TokenBucket::new(0.0, Duration::from_secs(1)).unwrap_err(),
            ConfigError::NonPositiveRate(0.0)
        );
        assert_eq!(
            TokenBucket::new(10.0, Duration::ZERO).unwrap_err(),
            ConfigError::NonPositivePeriod(Duration::ZERO)
        );
    }

    #[test]
    fn test_overflowing_fill_rate_rejected() {
        let clock = Arc::new(ManualClock::new());
        let result = TokenBucket::with_clock(1e300, Duration::from_nanos(1), Arc::clone(&clock));
        assert!(matches!(result, Err(ConfigError::UnboundedRefill { .. })));

        // Largest accepted speed still keeps tokens within bounds
        let bucket = TokenBucket::with_clock(1e300, Duration::from_secs(1), clock.clone()).unwrap();
        for _ in 0..3 {
            bucket.check(true);
            let tokens = bucket.tokens();
            assert!((0.0..=1e300).contains(&tokens), "tokens = {tokens}");
            clock.advance(Duration::from_secs(1));
        }
    }

    #[test]
    fn test_starts_full() {
        let (_clock, bucket) = bucket(10.0, 10);
        assert_eq!(bucket.tokens(), 10.0);
        assert_eq!(bucket.capacity(), 10.0);
        assert_eq!(bucket.refill_period(), Duration::from_secs(10));
    }

    #[test]
    fn test_saturation() {
        let (_clock, bucket) = bucket(10.0, 1);

        for _ in 0..10 {
            assert!(bucket.check(true));
        }
        assert!(!bucket.check(true));
        assert!(!bucket.check(true));
    }

    #[test]
    fn test_saturation_fractional_capacity() {
        let (_clock, bucket) = bucket(2.5, 1);

        assert!(bucket.check(true));
        assert!(bucket.check(true));
        assert!(!bucket.check(true));
        assert!((bucket.tokens() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_capacity_below_one_never_admits() {
        let (clock, bucket) = bucket(0.5, 1);
        assert!(!bucket.check(true));
        clock.advance(Duration::from_secs(3600));
        assert!(!bucket.check(true));
    }

    #[test]
    fn test_refill_one_token_per_second() {
        let (clock, bucket) = bucket(60.0, 60);

        for _ in 0..60 {
            assert!(bucket.check(true));
        }
        assert!(!bucket.check(true));

        clock.advance(Duration::from_secs(1));
        assert!(bucket.check(true));
        assert!(!bucket.check(true));
    }

    #[test]
    fn test_partial_refill_accumulates() {
        let (clock, bucket) = bucket(4.0, 4);
        for _ in 0..4 {
            assert!(bucket.check(true));
        }

        clock.advance(Duration::from_millis(500));
        assert!(!bucket.check(true));
        clock.advance(Duration::from_millis(500));
        assert!(bucket.check(true));
    }

    #[test]
    fn test_refill_clamps_to_capacity() {
        let (clock, bucket) = bucket(5.0, 5);
        assert!(bucket.check(true));

        clock.advance(Duration::from_secs(3600));
        assert!(bucket.check(true));
        assert_eq!(bucket.tokens(), 4.0);
    }

    #[test]
    fn test_full_recovery_within_period() {
        let (clock, bucket) = bucket(10.0, 10);
        for _ in 0..10 {
            assert!(bucket.check(true));
        }

        clock.advance(Duration::from_secs(10));
        for _ in 0..10 {
            assert!(bucket.check(true));
        }
        assert!(!bucket.check(true));
    }

    #[test]
    fn test_probe_does_not_consume() {
        let (_clock, bucket) = bucket(1.0, 1);

        for _ in 0..5 {
            assert!(bucket.check(false));
        }
        assert!(bucket.check(true));
        assert!(!bucket.check(false));
        assert!(!bucket.check(true));
    }

    #[test]
    fn test_probe_does_not_advance_refill_clock() {
        let (clock, bucket) = bucket(2.0, 2);
        assert!(bucket.check(true));
        assert!(bucket.check(true));
        let committed_at = bucket.last_refill();

        clock.advance(Duration::from_millis(400));
        assert!(!bucket.check(false));
        assert_eq!(bucket.last_refill(), committed_at);
        assert_eq!(bucket.tokens(), 0.0);
    }

    #[test]
    fn test_repeated_probes_keep_commit_outcome() {
        let (clock, bucket) = bucket(1.0, 1);
        assert!(bucket.check(true));

        clock.advance(Duration::from_millis(400));
        for _ in 0..10 {
            assert!(!bucket.check(false));
        }
        assert!(!bucket.check(true));

        clock.advance(Duration::from_millis(600));
        assert!(bucket.check(false));
        assert!(bucket.check(false));
        assert!(bucket.check(true));
    }

    #[test]
    fn test_denied_commit_keeps_refill() {
        let (clock, bucket) = bucket(1.0, 1);
        assert!(bucket.check(true));

        clock.advance(Duration::from_millis(600));
        assert!(!bucket.check(true));
        assert!((bucket.tokens() - 0.6).abs() < 1e-9);

        clock.advance(Duration::from_millis(400));
        assert!(bucket.check(true));
    }

    #[test]
    fn test_tokens_invariant() {
        let (clock, bucket) = bucket(3.0, 2);
        let steps = [0u64, 10, 250, 0, 0, 900, 5_000, 1, 333, 0, 0, 0, 2_000];

        for (i, ms) in steps.iter().cycle().take(200).enumerate() {
            clock.advance(Duration::from_millis(*ms));
            bucket.check(i % 3 != 0);
            let tokens = bucket.tokens();
            assert!(tokens >= 0.0, "tokens went negative: {tokens}");
            assert!(tokens <= 3.0, "tokens exceeded capacity: {tokens}");
        }
    }

    #[test]
    fn test_concurrent_single_token() {
        let (_clock, bucket) = bucket(1.0, 60);
        let bucket = Arc::new(bucket);
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    bucket.check(true)
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
    }

    #[test]
    fn test_real_clock_bucket() {
        let bucket = TokenBucket::new(2.0, Duration::from_secs(60)).unwrap();
        assert!(bucket.check(true));
        assert!(bucket.check(true));
        assert!(!bucket.check(true));
    }

    #[test]
    fn test_debug_impl() {
        let (_clock, bucket) = bucket(10.0, 5);
        let debug_str = format!("{:?}", bucket);

        assert!(debug_str.contains("TokenBucket"));
        assert!(debug_str.contains("capacity: 10.0"));
        assert!(debug_str.contains("tokens: 10.0"));
    }
}
