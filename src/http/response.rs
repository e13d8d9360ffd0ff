//! Structured rejection responses.
//!
//! # Responsibilities
//! - Render every rejection as `{ "message", "timestamp" }` JSON
//! - Attach `Retry-After` to throttling and lockout responses
//! - Mark responses that stand in for a failed wrapped application
//!
//! # Design Decisions
//! - No internal state or error detail ever reaches the caller
//! - Timestamps are RFC 3339 in UTC

use std::any::Any;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

/// Response extension set when the wrapped application produced no response.
#[derive(Debug, Clone, Copy)]
pub struct DownstreamFault;

/// Body of every rejection.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub timestamp: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Whole seconds, rounded up, so clients never retry too early.
pub fn retry_after_secs(retry_after: &Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Why the interceptor refused a request.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("Too many requests. Please try again later.")]
    Throttled { retry_after: Duration },

    #[error("Too many authentication requests. Please try again later.")]
    AuthThrottled { retry_after: Duration },

    #[error(
        "Too many failed login attempts. Please try again in {} seconds.",
        retry_after_secs(.retry_after)
    )]
    LockedOut { retry_after: Duration },

    #[error("Malformed request.")]
    Malformed,

    #[error("Request body too large.")]
    PayloadTooLarge,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::Throttled { .. } | Rejection::AuthThrottled { .. } | Rejection::LockedOut { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Rejection::Malformed => StatusCode::BAD_REQUEST,
            Rejection::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Rejection::Throttled { retry_after }
            | Rejection::AuthThrottled { retry_after }
            | Rejection::LockedOut { retry_after } => Some(*retry_after),
            Rejection::Malformed | Rejection::PayloadTooLarge => None,
        }
    }

    /// Metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::Throttled { .. } => "general",
            Rejection::AuthThrottled { .. } => "auth",
            Rejection::LockedOut { .. } => "lockout",
            Rejection::Malformed => "malformed",
            Rejection::PayloadTooLarge => "too_large",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status(), Json(ErrorBody::new(self.to_string()))).into_response();
        if let Some(retry_after) = self.retry_after() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(&retry_after)));
        }
        response
    }
}

/// A 500 standing in for a wrapped application that failed to answer.
pub fn downstream_fault() -> axum::response::Response {
    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("Internal server error.")),
    )
        .into_response();
    response.extensions_mut().insert(DownstreamFault);
    response
}

/// `CatchPanicLayer` handler for a panicking wrapped application.
pub fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    tracing::error!("Wrapped application panicked");
    downstream_fault()
}
