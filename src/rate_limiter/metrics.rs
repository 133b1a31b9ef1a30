//! # Registry Statistics
//!
//! Point-in-time counters describing how a [`RateLimiterRegistry`] has been
//! used. Counters are read with relaxed ordering, so a snapshot taken while
//! checks are in flight may be off by the in-flight calls.
//!
//! [`RateLimiterRegistry`]: super::RateLimiterRegistry

use std::fmt;

/// Snapshot of a registry's counters.
///
/// # Example
///
/// ```rust
/// use qrgate::{RateLimiterConfig, RateLimiterRegistry};
///
/// let registry: RateLimiterRegistry<String> =
///     RateLimiterRegistry::new(RateLimiterConfig::per_second(1)).unwrap();
/// registry.check("10.0.0.1", true);
/// registry.check("10.0.0.1", true);
///
/// let stats = registry.stats();
/// assert_eq!(stats.tracked_identities, 1);
/// assert_eq!(stats.total_allowed, 1);
/// assert_eq!(stats.total_denied, 1);
/// println!("{stats}");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryStats {
    /// Identities that currently own a bucket.
    pub tracked_identities: usize,

    /// Buckets created since the registry was built.
    pub total_created: u64,

    /// Checks answered `true` by a bucket.
    pub total_allowed: u64,

    /// Checks answered `false` by a bucket.
    pub total_denied: u64,

    /// Checks admitted without a lookup because limiting was disabled.
    pub total_bypassed: u64,

    /// Whether the admission gate was on when the snapshot was taken.
    pub enabled: bool,
}

impl RegistryStats {
    /// Checks that reached a bucket.
    #[inline]
    pub fn total_checked(&self) -> u64 {
        self.total_allowed + self.total_denied
    }

    /// Fraction of bucket checks that were admitted, `1.0` when none were made.
    pub fn admission_rate(&self) -> f64 {
        let total = self.total_checked();
        if total == 0 {
            1.0
        } else {
            self.total_allowed as f64 / total as f64
        }
    }

    /// Fraction of bucket checks that were denied.
    #[inline]
    pub fn denial_rate(&self) -> f64 {
        1.0 - self.admission_rate()
    }

    /// Human-readable multi-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Rate Limiter Registry Stats:\n\
             ├─ Gate: {}\n\
             ├─ Identities:\n\
             │  ├─ Tracked: {}\n\
             │  └─ Created: {}\n\
             └─ Checks:\n\
                ├─ Allowed: {}\n\
                ├─ Denied: {}\n\
                ├─ Bypassed: {}\n\
                └─ Admission Rate: {:.2}%",
            if self.enabled { "enabled" } else { "disabled" },
            self.tracked_identities,
            self.total_created,
            self.total_allowed,
            self.total_denied,
            self.total_bypassed,
            self.admission_rate() * 100.0
        )
    }
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
