//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities and windows > 0, addresses parse)
//! - Reject an upstream the HTTP client cannot reach
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ShieldConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ShieldConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &ShieldConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let security = &config.security;

    let positive = [
        ("security.max_requests_per_window", u64::from(security.max_requests_per_window)),
        ("security.rate_limit_window_minutes", security.rate_limit_window_minutes),
        ("security.max_auth_requests_per_window", u64::from(security.max_auth_requests_per_window)),
        ("security.auth_rate_limit_window_minutes", security.auth_rate_limit_window_minutes),
        ("security.max_login_attempts", u64::from(security.max_login_attempts)),
        ("security.login_brute_force_window_minutes", security.login_brute_force_window_minutes),
        ("security.max_tracked_keys", security.max_tracked_keys as u64),
        ("security.max_login_body_bytes", security.max_login_body_bytes as u64),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("upstream.timeout_secs", config.upstream.timeout_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if security.auth_route_patterns.iter().all(|p| p.trim().is_empty()) {
        errors.push(ValidationError::new(
            "security.auth_route_patterns",
            "at least one non-empty pattern is required",
        ));
    }

    if security.login_route.trim().is_empty() {
        errors.push(ValidationError::new("security.login_route", "must not be empty"));
    }

    if security.account_fields.iter().all(|f| f.trim().is_empty()) {
        errors.push(ValidationError::new(
            "security.account_fields",
            "at least one field name is required",
        ));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    match Url::parse(&config.upstream.url) {
        Ok(url) if url.scheme() != "http" => {
            errors.push(ValidationError::new("upstream.url", "only http upstreams are supported"));
        }
        Ok(url) if url.host_str().is_none() => {
            errors.push(ValidationError::new("upstream.url", "missing host"));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("upstream.url", e.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
