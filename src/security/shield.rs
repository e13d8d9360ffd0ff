//! The protection state injected into the interceptor.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{LoginSuccessPolicy, SecurityConfig};
use crate::routing::RouteClassifier;
use crate::security::brute_force::BruteForceGuard;
use crate::security::clock::{Clock, SystemClock};
use crate::security::inspection::Inspector;
use crate::security::rate_limit::{LimiterKind, RateLimiter};
use crate::security::SecurityError;

const MINUTE: Duration = Duration::from_secs(60);

/// Validated, immutable protection settings.
#[derive(Debug, Clone)]
pub struct SecurityOptions {
    pub general_capacity: u32,
    pub general_window: Duration,
    pub auth_capacity: u32,
    pub auth_window: Duration,
    pub max_login_attempts: u32,
    pub login_window: Duration,
    pub auth_route_patterns: Vec<String>,
    pub login_route: String,
    pub account_fields: Vec<String>,
    pub login_success: LoginSuccessPolicy,
    pub trust_forwarded_headers: bool,
    pub max_tracked_keys: usize,
    pub max_login_body_bytes: usize,
    pub suspicious_patterns: Vec<String>,
}

impl SecurityOptions {
    pub fn from_config(config: &SecurityConfig) -> Result<Self, SecurityError> {
        let minutes = |field: &'static str, value: u64| -> Result<Duration, SecurityError> {
            match value {
                0 => Err(SecurityError::InvalidWindow(field)),
                v => v
                    .checked_mul(60)
                    .map(Duration::from_secs)
                    .ok_or(SecurityError::InvalidWindow(field)),
            }
        };

        Ok(Self {
            general_capacity: config.max_requests_per_window,
            general_window: minutes("general", config.rate_limit_window_minutes)?,
            auth_capacity: config.max_auth_requests_per_window,
            auth_window: minutes("auth", config.auth_rate_limit_window_minutes)?,
            max_login_attempts: config.max_login_attempts,
            login_window: minutes("login", config.login_brute_force_window_minutes)?,
            auth_route_patterns: config.auth_route_patterns.clone(),
            login_route: config.login_route.clone(),
            account_fields: config.account_fields.clone(),
            login_success: config.login_success,
            trust_forwarded_headers: config.trust_forwarded_headers,
            max_tracked_keys: config.max_tracked_keys,
            max_login_body_bytes: config.max_login_body_bytes,
            suspicious_patterns: config.suspicious_patterns.clone(),
        })
    }
}

impl Default for SecurityOptions {
    fn default() -> Self {
        let config = SecurityConfig::default();
        Self {
            general_capacity: config.max_requests_per_window,
            general_window: MINUTE * config.rate_limit_window_minutes as u32,
            auth_capacity: config.max_auth_requests_per_window,
            auth_window: MINUTE * config.auth_rate_limit_window_minutes as u32,
            max_login_attempts: config.max_login_attempts,
            login_window: MINUTE * config.login_brute_force_window_minutes as u32,
            auth_route_patterns: config.auth_route_patterns,
            login_route: config.login_route,
            account_fields: config.account_fields,
            login_success: config.login_success,
            trust_forwarded_headers: config.trust_forwarded_headers,
            max_tracked_keys: config.max_tracked_keys,
            max_login_body_bytes: config.max_login_body_bytes,
            suspicious_patterns: config.suspicious_patterns,
        }
    }
}

/// Limiters, guard and route knowledge for one protected service.
///
/// Built once at startup and shared through `Arc`; all mutable state lives
/// inside the limiters and the guard.
#[derive(Debug)]
pub struct Shield {
    pub(crate) options: SecurityOptions,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) general: RateLimiter,
    pub(crate) auth: RateLimiter,
    pub(crate) guard: BruteForceGuard,
    pub(crate) routes: RouteClassifier,
    pub(crate) inspector: Inspector,
}

impl Shield {
    /// Build a shield on the system clock.
    pub fn new(options: SecurityOptions) -> Result<Self, SecurityError> {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    pub fn with_clock(options: SecurityOptions, clock: Arc<dyn Clock>) -> Result<Self, SecurityError> {
        if options.general_capacity == 0 {
            return Err(SecurityError::InvalidCapacity(LimiterKind::General.as_str()));
        }
        if options.auth_capacity == 0 {
            return Err(SecurityError::InvalidCapacity(LimiterKind::Auth.as_str()));
        }
        if options.max_login_body_bytes == 0 {
            return Err(SecurityError::InvalidBodyLimit);
        }

        let general = RateLimiter::new(
            LimiterKind::General,
            options.general_capacity,
            options.general_window,
            options.max_tracked_keys,
        )?;
        let auth = RateLimiter::new(
            LimiterKind::Auth,
            options.auth_capacity,
            options.auth_window,
            options.max_tracked_keys,
        )?;
        let guard = BruteForceGuard::new(
            options.max_login_attempts,
            options.login_window,
            options.max_tracked_keys,
        )?;
        let routes = RouteClassifier::new(&options.auth_route_patterns, &options.login_route);
        let inspector = Inspector::new(&options.suspicious_patterns);

        Ok(Self {
            options,
            clock,
            general,
            auth,
            guard,
            routes,
            inspector,
        })
    }

    pub fn options(&self) -> &SecurityOptions {
        &self.options
    }

    pub fn general_limiter(&self) -> &RateLimiter {
        &self.general
    }

    pub fn auth_limiter(&self) -> &RateLimiter {
        &self.auth
    }

    pub fn brute_force_guard(&self) -> &BruteForceGuard {
        &self.guard
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}
