//! Error types for the rate limiter.
//!
//! Admission checks never fail; the only error is a bad configuration,
//! which is rejected before any bucket exists.

use std::time::Duration;
use thiserror::Error;

/// Result type for rate limiter construction.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The token capacity (requests per window) is zero, negative or not a number.
    #[error("rate must be a positive finite number, got {0}")]
    NonPositiveRate(f64),

    /// The refill window is zero.
    #[error("refill period must be greater than zero, got {0:?}")]
    NonPositivePeriod(Duration),

    /// `rate / per` does not fit in an `f64`.
    #[error("refill speed of {rate:e} tokens per {per:?} is too large to represent")]
    UnboundedRefill {
        /// Configured capacity.
        rate: f64,
        /// Configured window.
        per: Duration,
    },
}
