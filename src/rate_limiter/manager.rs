//! # Per-Client Rate Limiter Registry
//!
//! Maps each client identity to its own [`TokenBucket`], creating buckets the
//! first time an identity is seen. Every bucket shares the registry's
//! configuration.
//!
//! ```text
//!     Client Requests:
//!     "1.2.3.4" ──┐
//!     "5.6.7.8" ──┼──► Registry ──► enabled? ──no──► ✅ (nothing touched)
//!     Unknown ────┘        │
//!                          ▼ yes
//!                   ┌──────────────┐
//!                   │   DashMap    │
//!                   │  id → bucket │──► TokenBucket::check
//!                   │  id → bucket │
//!                   └──────────────┘
//! ```
//!
//! ## Key Properties
//!
//! 1. **One bucket per identity**: creation goes through the map's entry API,
//!    so racing first requests for one identity share a single bucket
//! 2. **Isolation**: buckets are only reached through their own key
//! 3. **Gate first**: when disabled, checks return before any lookup, so a
//!    disabled registry never grows
//! 4. **No eviction**: buckets live as long as the registry

use super::{
    clock::{Clock, MonotonicClock},
    config::RateLimiterConfig,
    core::TokenBucket,
    error::ConfigResult,
    metrics::RegistryStats,
};
use dashmap::DashMap;
use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Registry of token buckets keyed by client identity.
///
/// `K` is any hashable identity: an IP string, an [`IpAddr`], or the
/// service's [`ClientIdentity`]. The registry is meant to be built once at
/// startup and shared through an `Arc`.
///
/// # Example
///
/// ```rust
/// use qrgate::{RateLimiterConfig, RateLimiterRegistry};
///
/// let registry: RateLimiterRegistry<String> =
///     RateLimiterRegistry::new(RateLimiterConfig::per_minute(2)).unwrap();
///
/// assert!(registry.check("1.2.3.4", true));
/// assert!(registry.check("1.2.3.4", true));
/// assert!(!registry.check("1.2.3.4", true));
///
/// // Another client is unaffected
/// assert!(registry.check("5.6.7.8", true));
/// ```
///
/// [`IpAddr`]: std::net::IpAddr
/// [`ClientIdentity`]: crate::ClientIdentity
pub struct RateLimiterRegistry<K, C = MonotonicClock> {
    /// Identity to bucket. Buckets are `Arc`ed so the shard lock is released
    /// before the bucket's own lock is taken.
    buckets: DashMap<K, Arc<TokenBucket<C>>, ahash::RandomState>,

    /// Template for new buckets.
    config: RateLimiterConfig,

    /// Admission gate, read on every check.
    enabled: AtomicBool,

    clock: C,

    total_created: AtomicU64,
    total_allowed: AtomicU64,
    total_denied: AtomicU64,
    total_bypassed: AtomicU64,
}

impl<K> RateLimiterRegistry<K, MonotonicClock>
where
    K: Eq + Hash + Debug,
{
    /// Creates a registry driven by the process monotonic clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](super::ConfigError) if `config.rate` is not
    /// positive or `config.per` is zero.
    pub fn new(config: RateLimiterConfig) -> ConfigResult<Self> {
        Self::with_clock(config, MonotonicClock)
    }
}

impl<K, C> RateLimiterRegistry<K, C>
where
    K: Eq + Hash + Debug,
    C: Clock + Clone,
{
    /// Creates a registry whose buckets read time from `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`RateLimiterRegistry::new`].
    pub fn with_clock(config: RateLimiterConfig, clock: C) -> ConfigResult<Self> {
        if let Err(err) = config.validate() {
            warn!(error = %err, "Rejected rate limiter configuration");
            return Err(err);
        }

        // More shards = less contention but more memory overhead
        let num_shards = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8)
            .next_power_of_two()
            .clamp(4, 64);

        info!(
            rate = config.rate,
            per_secs = config.per.as_secs_f64(),
            enabled = config.enabled,
            "Rate limiter registry initialized"
        );

        Ok(Self {
            buckets: DashMap::with_hasher_and_shard_amount(ahash::RandomState::new(), num_shards),
            enabled: AtomicBool::new(config.enabled),
            config,
            clock,
            total_created: AtomicU64::new(0),
            total_allowed: AtomicU64::new(0),
            total_denied: AtomicU64::new(0),
            total_bypassed: AtomicU64::new(0),
        })
    }

    /// Decides whether a request from `identity` is admitted.
    ///
    /// - Disabled registry: returns `true` without looking at the map.
    /// - Unknown identity: a full bucket is created, then checked.
    /// - Known identity: delegates to its bucket.
    ///
    /// `consume == false` is a dry run, see [`TokenBucket::check`]. A dry run
    /// against a new identity still creates its bucket.
    pub fn check<Q>(&self, identity: &Q, consume: bool) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if !self.enabled.load(Ordering::Acquire) {
            self.total_bypassed.fetch_add(1, Ordering::Relaxed);
            return true;
        }

        let allowed = self.bucket(identity).check(consume);
        if allowed {
            self.total_allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_denied.fetch_add(1, Ordering::Relaxed);
            trace!(identity = ?identity.to_owned(), "Request rate limited");
        }
        allowed
    }

    /// Committing check, `check(identity, true)`.
    #[inline]
    pub fn try_acquire<Q>(&self, identity: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.check(identity, true)
    }

    /// Dry-run check, `check(identity, false)`.
    #[inline]
    pub fn probe<Q>(&self, identity: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.check(identity, false)
    }

    /// Returns the bucket for `identity`, creating it on first sight.
    fn bucket<Q>(&self, identity: &Q) -> Arc<TokenBucket<C>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        // Fast path: bucket already exists
        if let Some(bucket) = self.buckets.get(identity) {
            return Arc::clone(bucket.value());
        }

        match self.buckets.entry(identity.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => {
                // Another thread created it while we were checking
                Arc::clone(occupied.get())
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let bucket = Arc::new(TokenBucket::from_config(&self.config, self.clock.clone()));
                let total = self.total_created.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(identity = ?vacant.key(), total, "Created token bucket");
                vacant.insert(Arc::clone(&bucket));
                bucket
            }
        }
    }
}

impl<K, C> RateLimiterRegistry<K, C>
where
    K: Eq + Hash,
{
    /// Whether checks are currently being limited.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turns the admission gate on or off.
    ///
    /// Existing buckets are kept while disabled and resume where they left
    /// off, refilled for the time that passed.
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!(enabled, "Rate limiting toggled");
        }
    }

    /// Shared bucket configuration.
    #[inline]
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Number of identities with a bucket.
    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// `true` if no bucket has been created yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Whether `identity` already owns a bucket.
    pub fn contains<Q>(&self, identity: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.buckets.contains_key(identity)
    }

    /// Snapshot of the registry counters.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            tracked_identities: self.len(),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_allowed: self.total_allowed.load(Ordering::Relaxed),
            total_denied: self.total_denied.load(Ordering::Relaxed),
            total_bypassed: self.total_bypassed.load(Ordering::Relaxed),
            enabled: self.is_enabled(),
        }
    }
}

impl<K, C> std::fmt::Debug for RateLimiterRegistry<K, C>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterRegistry")
            .field("rate", &self.config.rate)
            .field("per", &self.config.per)
            .field("enabled", &self.is_enabled())
            .field("tracked_identities", &self.len())
            .finish()
    }
}
