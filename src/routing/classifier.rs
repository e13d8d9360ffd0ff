//! Route classification for the protection layer.
//!
//! # Responsibilities
//! - Normalize the request path
//! - Decide whether a request targets an authentication route
//! - Single out the login call (login path on POST)
//!
//! # Design Decisions
//! - Paths are percent-decoded before matching, so `/auth/%6Cogin` is the login route
//! - Matching is case-insensitive substring containment
//! - Patterns are normalized once at construction
//! - No regex to guarantee O(n) matching

use axum::http::Method;
use percent_encoding::percent_decode_str;

/// How the interceptor treats a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Only the general limiter applies.
    General,
    /// General and auth limiters apply.
    Auth,
    /// General and auth limiters plus the brute-force guard apply.
    Login,
}

impl RouteClass {
    pub fn is_auth(&self) -> bool {
        matches!(self, RouteClass::Auth | RouteClass::Login)
    }
}

/// Percent-decode, lower-case, collapse repeated slashes and `.` segments,
/// and drop a trailing slash.
pub fn normalize_path(path: &str) -> String {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let mut normalized = String::with_capacity(decoded.len() + 1);
    for segment in decoded.split('/').filter(|s| !s.is_empty() && *s != ".") {
        normalized.push('/');
        normalized.extend(segment.chars().flat_map(char::to_lowercase));
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Classifies requests against the configured auth patterns.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    auth_patterns: Vec<String>,
    login_pattern: String,
}

impl RouteClassifier {
    pub fn new<I, S>(auth_patterns: I, login_route: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let login_pattern = normalize_path(login_route.trim());
        let mut auth_patterns: Vec<String> = auth_patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .map(|p| normalize_path(&p))
            .collect();
        // The login route is always an auth route
        if !auth_patterns.contains(&login_pattern) {
            auth_patterns.push(login_pattern.clone());
        }
        Self {
            auth_patterns,
            login_pattern,
        }
    }

    pub fn classify(&self, method: &Method, path: &str) -> RouteClass {
        let path = normalize_path(path);
        if !self.auth_patterns.iter().any(|p| path.contains(p.as_str())) {
            return RouteClass::General;
        }
        if method == Method::POST && path.contains(self.login_pattern.as_str()) {
            RouteClass::Login
        } else {
            RouteClass::Auth
        }
    }
}
