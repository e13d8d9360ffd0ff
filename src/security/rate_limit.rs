//! Per-client request rate limiting.
//!
//! Two independent instances run in the interceptor: a general limiter on
//! every request and a stricter one on authentication routes. They share no
//! budget.

use std::time::{Duration, Instant};

use crate::security::identity::ClientKey;
use crate::security::window::{Decision, SlidingWindow};
use crate::security::SecurityError;

/// Which limiter produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimiterKind {
    General,
    Auth,
}

impl LimiterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimiterKind::General => "general",
            LimiterKind::Auth => "auth",
        }
    }
}

/// A sliding-window limiter keyed by client.
#[derive(Debug)]
pub struct RateLimiter {
    kind: LimiterKind,
    window: SlidingWindow<ClientKey>,
}

impl RateLimiter {
    pub fn new(
        kind: LimiterKind,
        capacity: u32,
        window: Duration,
        max_keys: usize,
    ) -> Result<Self, SecurityError> {
        Ok(Self {
            kind,
            window: SlidingWindow::new(kind.as_str(), capacity, window, max_keys)?,
        })
    }

    /// Count one request from `client`.
    pub fn check(&self, client: &ClientKey, now: Instant) -> Decision {
        let decision = self.window.record(client, now);
        if let Decision::Untracked = decision {
            crate::observability::metrics::record_fail_open("capacity");
        }
        decision
    }

    pub fn kind(&self) -> LimiterKind {
        self.kind
    }

    /// Requests from `client` inside the current window.
    pub fn current(&self, client: &ClientKey, now: Instant) -> usize {
        self.window.count(client, now)
    }

    pub fn tracked_clients(&self) -> usize {
        self.window.tracked_keys()
    }
}
