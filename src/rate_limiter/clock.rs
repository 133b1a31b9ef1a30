//! # Time Sources
//!
//! The token bucket never calls `Instant::now()` directly. It asks a [`Clock`]
//! for the current instant, so production code reads the monotonic OS clock
//! while tests drive time by hand.
//!
//! ```text
//!     TokenBucket ──► Clock::now()
//!                        │
//!          ┌─────────────┴─────────────┐
//!          ▼                           ▼
//!   MonotonicClock               ManualClock
//!   (Instant::now)          (origin + advanced offset)
//! ```
//!
//! Both clocks are monotonic, which keeps refill arithmetic safe when the
//! wall clock jumps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of monotonic instants.
///
/// Implementations must be cheap and non-blocking: the clock is read on
/// every admission check.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// The process monotonic clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline(always)]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Starts at the instant it was created and advances by whatever is passed
/// to [`ManualClock::advance`]. Share it between a registry and a test via
/// `Arc<ManualClock>`.
///
/// # Example
///
/// ```rust
/// use qrgate::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let t0 = clock.now();
/// clock.advance(Duration::from_millis(1500));
/// assert_eq!(clock.now() - t0, Duration::from_millis(1500));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_ns: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ns: AtomicU64::new(0),
        }
    }

    /// Moves the clock forward. The offset saturates at `u64::MAX`
    /// nanoseconds instead of wrapping.
    pub fn advance(&self, by: Duration) {
        let ns = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .offset_ns
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |offset| {
                Some(offset.saturating_add(ns))
            });
    }

    /// Moves the clock forward by a fractional number of seconds.
    ///
    /// Negative or non-finite values are ignored.
    pub fn advance_secs_f64(&self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            self.advance(Duration::from_secs_f64(secs));
        }
    }

    /// Total time this clock has been advanced since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_ns.load(Ordering::Acquire))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}
