//! Client identity resolution.
//!
//! # Responsibilities
//! - Derive a stable caller key for every request
//! - Prefer forwarding headers when the shield sits behind a trusted proxy
//! - Fall back to the transport peer address
//!
//! # Design Decisions
//! - A forwarding header that does not parse is skipped, not trusted
//! - No usable source at all is a fault; the interceptor fails open on it

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;
use thiserror::Error;

/// Opaque caller identity, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IpAddr> for ClientKey {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl From<&str> for ClientKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Failure to identify the caller.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no forwarding header and no peer address available")]
    NoSource,
}

/// Resolve the caller key for a request.
pub fn resolve_client_key<B>(req: &Request<B>, trust_forwarded: bool) -> Result<ClientKey, IdentityError> {
    let forwarded = if trust_forwarded {
        from_x_forwarded_for(req)
            .or_else(|| from_x_real_ip(req))
            .or_else(|| from_forwarded(req))
    } else {
        None
    };

    forwarded
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip())
        })
        .map(ClientKey::from)
        .ok_or(IdentityError::NoSource)
}

fn header_str<'a, B>(req: &'a Request<B>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|h| h.to_str().ok())
}

/// Leftmost valid address of `X-Forwarded-For` ("client, proxy1, proxy2").
fn from_x_forwarded_for<B>(req: &Request<B>) -> Option<IpAddr> {
    header_str(req, "x-forwarded-for")?
        .split(',')
        .map(str::trim)
        .find_map(parse_ip)
}

fn from_x_real_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    parse_ip(header_str(req, "x-real-ip")?.trim())
}

/// RFC 7239: `for=192.0.2.60;proto=http`, `for="[2001:db8::1]:4711"`.
fn from_forwarded<B>(req: &Request<B>) -> Option<IpAddr> {
    header_str(req, "forwarded")?
        .split([';', ','])
        .map(str::trim)
        .filter_map(|part| {
            let (name, value) = part.split_once('=')?;
            name.trim().eq_ignore_ascii_case("for").then_some(value.trim())
        })
        .find_map(|value| parse_ip(value.trim_matches('"')))
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }
    // Bracketed IPv6 or address with port
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .and_then(|v| v.parse().ok())
}
