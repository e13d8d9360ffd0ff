//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (resolve client key)
//!     → rate_limit.rs (general limiter, every request)
//!     → inspection.rs (suspicious patterns → 400)
//!     → rate_limit.rs (auth limiter, auth routes only)
//!     → brute_force.rs (pre-check, login only)
//!     → wrapped application
//!     → brute_force.rs (record outcome, login only)
//!     → headers.rs (hardening headers on every response)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail open on internal faults: availability over strictness
//! - All state is process-local and in memory; a restart resets it
//! - Per-key locking (store.rs); unrelated clients never contend

pub mod brute_force;
pub mod clock;
pub mod headers;
pub mod identity;
pub mod inspection;
pub mod rate_limit;
pub mod shield;
pub mod store;
pub mod window;

use thiserror::Error;

pub use brute_force::{BruteForceGuard, LoginCheck};
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{resolve_client_key, ClientKey, IdentityError};
pub use rate_limit::{LimiterKind, RateLimiter};
pub use shield::{SecurityOptions, Shield};
pub use window::{Decision, SlidingWindow};

/// Invalid protection settings, detected at construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecurityError {
    #[error("{0} window must be a positive duration")]
    InvalidWindow(&'static str),

    #[error("{0} capacity must be greater than zero")]
    InvalidCapacity(&'static str),

    #[error("max login attempts must be greater than zero")]
    InvalidAttempts,

    #[error("{0} key cap must be greater than zero")]
    InvalidKeyCap(&'static str),

    #[error("login body limit must be greater than zero")]
    InvalidBodyLimit,
}
