//! # qrgate - QR Code Service with Per-Client Rate Limiting
//!
//! An HTTP endpoint that renders QR codes, guarded by a token bucket rate
//! limiter keyed on the client's identity (usually its IP address).
//!
//! ## The Token Bucket Algorithm
//!
//! Every client gets a bucket holding up to `rate` tokens. Each admitted
//! request spends one token; tokens flow back continuously at `rate / per`
//! tokens per second.
//!
//! ```text
//!     rate = 60, per = 60s  (1 token/s)
//!
//!     t=0     [●●●●●…●] 60 tokens    60 requests ✅
//!     t=0     [○○○○○…○]  0 tokens    61st request ❌ (429)
//!     t=1s    [●○○○○…○]  1 token     next request ✅
//! ```
//!
//! ## Quick Start
//!
//! ### Rate limiting by identity
//!
//! ```rust
//! use qrgate::{RateLimiterConfig, RateLimiterRegistry};
//!
//! // 60 requests per minute per client, the service default
//! let registry: RateLimiterRegistry<String> =
//!     RateLimiterRegistry::new(RateLimiterConfig::default()).unwrap();
//!
//! if registry.check("203.0.113.7", true) {
//!     // handle the request
//! } else {
//!     // answer 429 Too Many Requests
//! }
//! ```
//!
//! ### Deterministic time in tests
//!
//! ```rust
//! use qrgate::{ManualClock, RateLimiterConfig, RateLimiterRegistry};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = Arc::new(ManualClock::new());
//! let registry: RateLimiterRegistry<String, _> =
//!     RateLimiterRegistry::with_clock(RateLimiterConfig::per_minute(1), clock.clone()).unwrap();
//!
//! assert!(registry.check("a", true));
//! assert!(!registry.check("a", true));
//! clock.advance(Duration::from_secs(60));
//! assert!(registry.check("a", true));
//! ```
//!
//! ### Serving
//!
//! The `qrgate` binary reads its settings from the environment
//! (`WEB_HOST`, `WEB_PORT`, `RATE_LIMIT`, `RATE_LIMIT_RATE`, `RATE_LIMIT_PER`)
//! and serves `GET /?data=...` with [`router`].
//!
//! ## Architecture Overview
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      GET /?data=…       │
//!                    └──────────┬──────────────┘
//!                               │
//!                    ┌──────────▼──────────────┐
//!                    │   ClientIdentity        │ CF-Connecting-IP,
//!                    │   extraction            │ X-Forwarded-For, peer
//!                    └──────────┬──────────────┘
//!                               │
//!                    ┌──────────▼──────────────┐
//!                    │  RateLimiterRegistry    │──► 429
//!                    └──────────┬──────────────┘
//!                               │
//!                ┌──────────────┴───────────────┐
//!                │                               │
//!     ┌──────────▼──────────┐       ┌───────────▼──────────┐
//!     │   QrOptions         │       │   render_png         │
//!     │  (query parsing)    │──────►│  (blocking worker)   │
//!     └─────────────────────┘       └──────────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! [`RateLimiterRegistry`] is `Send + Sync` and is shared through an `Arc`.
//! Checks for different identities run in parallel; checks for one identity
//! serialize on that identity's bucket.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

mod rate_limiter;
mod service;

pub use rate_limiter::{
    Clock, ConfigError, ConfigResult, ManualClock, MonotonicClock, RateLimiterConfig,
    RateLimiterRegistry, RegistryStats, TokenBucket, DEFAULT_PER, DEFAULT_RATE,
};

pub use service::{
    data_url, render_png, render_png_blocking, router, AppState, ArgumentError, ClientIdentity,
    QrOptions, RenderError, Settings, SettingsError, MAX_IMAGE_SIDE,
};

/// A registry keyed by [`ClientIdentity`], the shape the HTTP handler uses.
pub type ClientRegistry = RateLimiterRegistry<ClientIdentity>;

/// A [`ClientRegistry`] wrapped in `Arc` for sharing across request tasks.
pub type SharedRegistry = std::sync::Arc<ClientRegistry>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
///
/// ```rust
/// use qrgate::prelude::*;
///
/// let registry: RateLimiterRegistry<String> =
///     RateLimiterBuilder::new().rate(10.0).per_secs(1).build().unwrap();
/// assert!(registry.check("client", true));
/// ```
pub mod prelude {
    //! Common imports for typical use.

    pub use crate::{
        Clock, ClientIdentity, ClientRegistry, ConfigError, ManualClock, MonotonicClock,
        RateLimiterBuilder, RateLimiterConfig, RateLimiterRegistry, RegistryStats,
        SharedRegistry, TokenBucket,
    };
}

/// Builder for [`RateLimiterRegistry`].
///
/// Starts from [`RateLimiterConfig::default`] (60 requests per 60 seconds,
/// enabled) and validates on [`build`](Self::build).
///
/// # Example
///
/// ```rust
/// use qrgate::{RateLimiterBuilder, RateLimiterRegistry};
/// use std::net::IpAddr;
///
/// let registry: RateLimiterRegistry<IpAddr> = RateLimiterBuilder::new()
///     .rate(100.0)        // burst capacity
///     .per_secs(60)       // refilled over a minute
///     .enabled(true)
///     .build()
///     .unwrap();
///
/// // Invalid settings are rejected
/// let result = RateLimiterBuilder::new().rate(0.0).build::<IpAddr>();
/// assert!(result.is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RateLimiterBuilder {
    config: RateLimiterConfig,
}

impl RateLimiterBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket capacity and tokens restored per window.
    pub fn rate(mut self, rate: f64) -> Self {
        self.config.rate = rate;
        self
    }

    /// Window over which `rate` tokens are restored.
    pub fn per(mut self, per: std::time::Duration) -> Self {
        self.config.per = per;
        self
    }

    /// Window in whole seconds.
    pub fn per_secs(self, secs: u64) -> Self {
        self.per(std::time::Duration::from_secs(secs))
    }

    /// Initial state of the admission gate.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Builds a registry on the process monotonic clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the rate or window is not positive.
    pub fn build<K>(self) -> ConfigResult<RateLimiterRegistry<K>>
    where
        K: Eq + std::hash::Hash + std::fmt::Debug,
    {
        RateLimiterRegistry::new(self.config)
    }

    /// Builds a registry on a custom clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the rate or window is not positive.
    pub fn build_with_clock<K, C>(self, clock: C) -> ConfigResult<RateLimiterRegistry<K, C>>
    where
        K: Eq + std::hash::Hash + std::fmt::Debug,
        C: Clock + Clone,
    {
        RateLimiterRegistry::with_clock(self.config, clock)
    }
}
