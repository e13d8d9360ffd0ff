//! Security response headers.
//!
//! # Responsibilities
//! - Add clickjacking, MIME-sniffing, XSS and referrer hardening headers
//! - Apply them to every response, including rejections and panics
//!
//! # Design Decisions
//! - Headers override whatever the wrapped application set
//! - Installed as the outermost layers of the protected router

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

/// Header name/value pairs set on every response.
pub const HARDENING_HEADERS: [(&str, &str); 4] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
];

/// Wrap `router` so every response carries the hardening headers.
pub fn with_hardening_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    HARDENING_HEADERS.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}
