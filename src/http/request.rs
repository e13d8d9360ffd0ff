//! Request handling helpers.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for tracing
//! - Read a login body for the account identifier while keeping it
//!   intact for the wrapped application
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Login bodies are always buffered, bounded by the limit whatever the
//!   declared length says; a larger body is refused (413), never passed
//!   through unchecked

use axum::body::{Body, Bytes};
use axum::http::{header, Request};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Issues UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Why no account identifier could be read from a login body.
#[derive(Debug, Error)]
pub enum BodyPeekError {
    #[error("body is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("no account field present")]
    MissingAccount,
}

/// The login body could not be buffered; the request is not forwarded.
#[derive(Debug, Error)]
pub enum BodyReadError {
    #[error("login body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Read(axum::BoxError),
}

/// Result of peeking at a login request.
#[derive(Debug)]
pub struct PeekedLogin {
    /// The request, with an identical body.
    pub request: Request<Body>,
    /// The normalized account identifier, or why there is none.
    pub account: Result<String, BodyPeekError>,
}

/// Buffer a login body of at most `max_bytes` and read its account identifier.
pub async fn peek_login_account(
    request: Request<Body>,
    max_bytes: usize,
    fields: &[String],
) -> Result<PeekedLogin, BodyReadError> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    if declared.is_some_and(|length| length > max_bytes as u64) {
        return Err(BodyReadError::TooLarge { limit: max_bytes });
    }

    let (parts, body) = request.into_parts();
    let bytes = match Limited::new(body, max_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => return Err(BodyReadError::TooLarge { limit: max_bytes }),
        Err(e) => return Err(BodyReadError::Read(e)),
    };
    let account = account_from_json(&bytes, fields);

    Ok(PeekedLogin {
        request: Request::from_parts(parts, Body::from(bytes)),
        account,
    })
}

/// First non-empty string among `fields`, trimmed and lower-cased.
pub fn account_from_json(bytes: &Bytes, fields: &[String]) -> Result<String, BodyPeekError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    fields
        .iter()
        .filter_map(|field| value.get(field.as_str()).and_then(|v| v.as_str()))
        .map(|account| account.trim().to_lowercase())
        .find(|account| !account.is_empty())
        .ok_or(BodyPeekError::MissingAccount)
}
