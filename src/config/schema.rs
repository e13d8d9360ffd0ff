//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the shield.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the request shield.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShieldConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The wrapped application requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting and brute-force protection.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream (wrapped application) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the wrapped application. Only scheme and authority are used.
    pub url: String,

    /// Deadline for the wrapped application's response headers, in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Which login response statuses clear the brute-force record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoginSuccessPolicy {
    /// Only `200 OK` counts as a successful login.
    #[default]
    Exact200,
    /// Any `2xx` status counts as a successful login.
    Any2xx,
}

impl LoginSuccessPolicy {
    pub fn is_success(self, status: u16) -> bool {
        match self {
            LoginSuccessPolicy::Exact200 => status == 200,
            LoginSuccessPolicy::Any2xx => (200..300).contains(&status),
        }
    }
}

/// Rate limiting and brute-force protection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Requests allowed per client in the general window.
    #[serde(alias = "maxRequestsPerWindow")]
    pub max_requests_per_window: u32,

    /// Length of the general window in minutes.
    #[serde(alias = "rateLimitWindowMinutes")]
    pub rate_limit_window_minutes: u64,

    /// Requests allowed per client on auth routes.
    #[serde(alias = "maxAuthRequestsPerWindow")]
    pub max_auth_requests_per_window: u32,

    /// Length of the auth window in minutes.
    #[serde(alias = "authRateLimitWindowMinutes")]
    pub auth_rate_limit_window_minutes: u64,

    /// Failed logins per (client, account) before lockout.
    #[serde(alias = "maxLoginAttempts")]
    pub max_login_attempts: u32,

    /// Length of the failed-login window in minutes.
    #[serde(alias = "loginBruteForceWindowMinutes")]
    pub login_brute_force_window_minutes: u64,

    /// Path substrings that mark an authentication route.
    pub auth_route_patterns: Vec<String>,

    /// Path substring of the login route (matched on POST only).
    pub login_route: String,

    /// JSON fields of the login body holding the account identifier, in priority order.
    pub account_fields: Vec<String>,

    /// How the login response status is interpreted.
    pub login_success: LoginSuccessPolicy,

    /// Prefer forwarding headers over the peer address.
    pub trust_forwarded_headers: bool,

    /// Upper bound of distinct keys kept by each limiter and the guard.
    pub max_tracked_keys: usize,

    /// Largest login body that is buffered to read the account identifier.
    pub max_login_body_bytes: usize,

    /// Case-insensitive patterns that mark a request as malformed.
    pub suspicious_patterns: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: 100,
            rate_limit_window_minutes: 1,
            max_auth_requests_per_window: 10,
            auth_rate_limit_window_minutes: 15,
            max_login_attempts: 5,
            login_brute_force_window_minutes: 15,
            auth_route_patterns: vec![
                "/auth/login".to_string(),
                "/auth/register".to_string(),
                "/auth/refresh".to_string(),
                "/auth/forgot-password".to_string(),
            ],
            login_route: "/auth/login".to_string(),
            account_fields: vec!["email".to_string(), "username".to_string()],
            login_success: LoginSuccessPolicy::default(),
            trust_forwarded_headers: true,
            max_tracked_keys: 100_000,
            max_login_body_bytes: 64 * 1024,
            suspicious_patterns: vec![
                "<script".to_string(),
                "javascript:".to_string(),
                "../".to_string(),
                "..%2f".to_string(),
                "%00".to_string(),
                "union select".to_string(),
            ],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
