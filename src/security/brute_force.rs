//! Brute-force login protection.
//!
//! Failed logins are tracked per (client, account) pair. Once a pair has
//! `max_attempts` failures inside the window it is locked until the oldest
//! retained failure ages out. A successful login deletes the record at once.
//!
//! The pair is the key, so the guard is IP+account scoped: an attacker
//! rotating addresses against one account gets a fresh budget per address.

use std::fmt;
use std::time::{Duration, Instant};

use crate::observability::metrics;
use crate::security::identity::ClientKey;
use crate::security::store::KeyedStore;
use crate::security::SecurityError;

/// Key of a login attempt record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoginKey {
    pub client: ClientKey,
    pub account: String,
}

impl LoginKey {
    pub fn new(client: &ClientKey, account: &str) -> Self {
        Self {
            client: client.clone(),
            account: account.to_string(),
        }
    }
}

impl fmt::Display for LoginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.client, self.account)
    }
}

/// Result of a pre-login check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginCheck {
    Allowed,
    Locked { retry_after: Duration },
}

impl LoginCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, LoginCheck::Allowed)
    }
}

/// Tracks failed logins and locks out guessing.
#[derive(Debug)]
pub struct BruteForceGuard {
    max_attempts: u32,
    failures: KeyedStore<LoginKey>,
}

impl BruteForceGuard {
    pub fn new(max_attempts: u32, window: Duration, max_keys: usize) -> Result<Self, SecurityError> {
        if window.is_zero() {
            return Err(SecurityError::InvalidWindow("login"));
        }
        if max_attempts == 0 {
            return Err(SecurityError::InvalidAttempts);
        }
        if max_keys == 0 {
            return Err(SecurityError::InvalidKeyCap("login"));
        }
        Ok(Self {
            max_attempts,
            failures: KeyedStore::new("login", window, max_keys),
        })
    }

    /// Decide whether a login for the pair may proceed.
    pub fn pre_check(&self, client: &ClientKey, account: &str, now: Instant) -> LoginCheck {
        let key = LoginKey::new(client, account);
        let window = self.failures.window();
        let max_attempts = self.max_attempts as usize;

        self.failures
            .with_existing(&key, now, |failures| {
                if failures.len() >= max_attempts {
                    LoginCheck::Locked {
                        retry_after: failures.time_until_oldest_expires(now, window),
                    }
                } else {
                    LoginCheck::Allowed
                }
            })
            .unwrap_or(LoginCheck::Allowed)
    }

    /// Update the pair from an observed login response.
    pub fn record_outcome(&self, client: &ClientKey, account: &str, success: bool, now: Instant) {
        let key = LoginKey::new(client, account);
        if success {
            if self.failures.remove(&key) {
                tracing::debug!(client = %client, account = %account, "Login succeeded, failure record cleared");
            }
            metrics::record_login_outcome("success");
            return;
        }

        metrics::record_login_outcome("failure");
        let recorded = self.failures.with_record(&key, now, |failures| {
            failures.push(now);
            failures.len()
        });
        match recorded {
            Some(count) => tracing::debug!(
                client = %client,
                account = %account,
                failures = count,
                "Failed login recorded"
            ),
            None => metrics::record_fail_open("capacity"),
        }
    }

    /// Failures currently inside the window for the pair.
    pub fn failures(&self, client: &ClientKey, account: &str, now: Instant) -> usize {
        self.failures
            .with_existing(&LoginKey::new(client, account), now, |failures| failures.len())
            .unwrap_or(0)
    }

    pub fn tracked_pairs(&self) -> usize {
        self.failures.len()
    }

    pub fn sweep(&self, now: Instant) -> usize {
        self.failures.sweep(now)
    }
}
