//! # Rate Limiter Configuration
//!
//! One configuration is shared by every bucket a registry creates.
//!
//! ```text
//!     ┌──────────────────────────────┐
//!     │   rate (capacity)            │ ← burst limit, tokens
//!     │   ┌─────────────────────┐    │
//!     │   │ ● ● ● ● ● ● ● ● ●   │    │ ← current tokens
//!     │   └─────────────────────┘    │
//!     │                              │
//!     │   per: 60s                   │ ← time to refill `rate` tokens
//!     │   enabled: true              │ ← global admission gate
//!     └──────────────────────────────┘
//! ```
//!
//! Refill is continuous: the bucket gains `rate / per` tokens every second,
//! so an idle client recovers its whole allowance after exactly `per`.

use super::error::{ConfigError, ConfigResult};
use std::time::Duration;

/// Default number of requests allowed per window.
pub const DEFAULT_RATE: f64 = 60.0;

/// Default window length.
pub const DEFAULT_PER: Duration = Duration::from_secs(60);

/// Configuration for a rate limiter registry.
///
/// # Examples
///
/// ```rust
/// use qrgate::RateLimiterConfig;
/// use std::time::Duration;
///
/// // 60 requests per minute, the service default
/// let config = RateLimiterConfig::default();
/// assert_eq!(config.tokens_per_second(), 1.0);
///
/// // 10 requests per second
/// let config = RateLimiterConfig::per_second(10);
/// assert!(config.validate().is_ok());
///
/// // Arbitrary window
/// let config = RateLimiterConfig::new(5.0, Duration::from_millis(500));
/// assert_eq!(config.tokens_per_second(), 10.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterConfig {
    /// Bucket capacity, and the number of tokens restored over `per`.
    pub rate: f64,

    /// Time it takes an empty bucket to refill completely.
    pub per: Duration,

    /// When `false` every check is admitted without touching bucket state.
    pub enabled: bool,
}

impl Default for RateLimiterConfig {
    /// 60 requests per 60 seconds, enabled.
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            per: DEFAULT_PER,
            enabled: true,
        }
    }
}

impl RateLimiterConfig {
    /// Creates an enabled configuration allowing `rate` requests every `per`.
    pub fn new(rate: f64, per: Duration) -> Self {
        Self {
            rate,
            per,
            enabled: true,
        }
    }

    /// `requests` per second.
    pub fn per_second(requests: u32) -> Self {
        Self::new(f64::from(requests), Duration::from_secs(1))
    }

    /// `requests` per minute.
    pub fn per_minute(requests: u32) -> Self {
        Self::new(f64::from(requests), Duration::from_secs(60))
    }

    /// Sets the admission gate.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Checks that the configuration can drive a token bucket.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NonPositiveRate`] if `rate` is not a positive finite number
    /// - [`ConfigError::NonPositivePeriod`] if `per` is zero
    /// - [`ConfigError::UnboundedRefill`] if `rate / per` overflows
    ///
    /// ```rust
    /// use qrgate::RateLimiterConfig;
    /// use std::time::Duration;
    ///
    /// assert!(RateLimiterConfig::new(0.0, Duration::from_secs(1)).validate().is_err());
    /// assert!(RateLimiterConfig::new(1.0, Duration::ZERO).validate().is_err());
    /// ```
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(ConfigError::NonPositiveRate(self.rate));
        }
        if self.per.is_zero() {
            return Err(ConfigError::NonPositivePeriod(self.per));
        }
        if !self.tokens_per_second().is_finite() {
            return Err(ConfigError::UnboundedRefill {
                rate: self.rate,
                per: self.per,
            });
        }
        Ok(())
    }

    /// Continuous refill speed, `rate / per`.
    pub fn tokens_per_second(&self) -> f64 {
        let secs = self.per.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.rate / secs
        }
    }
}
