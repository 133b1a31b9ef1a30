//! # Rate Limiter Module
//!
//! Admission control for the service: one continuous-refill token bucket per
//! client identity, all sharing one configured rate.
//!
//! ## Module Structure
//!
//! ```text
//!     rate_limiter/
//!     ├── mod.rs          (You are here - Module organization)
//!     ├── clock.rs        (Injected time sources)
//!     ├── config.rs       (Rate, window and admission gate)
//!     ├── core.rs         (Token bucket algorithm)
//!     ├── error.rs        (Configuration errors)
//!     ├── manager.rs      (Identity → bucket registry)
//!     └── metrics.rs      (Registry counters)
//! ```
//!
//! ## Architecture Flow
//!
//! ```text
//!     Request handler
//!          │ identity
//!          ▼
//!     ┌──────────┐
//!     │ Registry │ ◄── gate, lazy per-identity buckets
//!     └────┬─────┘
//!          │
//!          ▼
//!     ┌──────────┐
//!     │  Bucket  │ ◄── refill + consume
//!     └────┬─────┘
//!          │
//!          ▼
//!     ┌──────────┐
//!     │  Clock   │ ◄── monotonic "now"
//!     └──────────┘
//! ```

mod clock;
mod config;
mod core;
mod error;
mod manager;
mod metrics;

/// Time sources for the token bucket
pub use clock::{Clock, ManualClock, MonotonicClock};

/// Configuration shared by every bucket of a registry
pub use config::{RateLimiterConfig, DEFAULT_PER, DEFAULT_RATE};

/// Single-identity token bucket
pub use core::TokenBucket;

/// Construction errors
pub use error::{ConfigError, ConfigResult};

/// Per-identity registry, the entry point for request handling
pub use manager::RateLimiterRegistry;

/// Registry counters
pub use metrics::RegistryStats;
