//! Forwarding to the wrapped application.
//!
//! # Responsibilities
//! - Rewrite the request URI to the configured upstream authority
//! - Stream the request and response bodies unchanged
//! - Turn a connection failure or a missed deadline into a marked 500
//!
//! # Design Decisions
//! - No retries: a login must never be submitted twice
//! - Hop-by-hop headers are left to hyper

use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::http::response::downstream_fault;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),
}

/// Client and target for the wrapped application.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    timeout: Duration,
}

impl Upstream {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let parsed = Url::parse(url).map_err(|e| UpstreamError::InvalidUrl(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| UpstreamError::InvalidUrl(format!("{} has no host", url)))?;
        let authority = match parsed.port_or_known_default() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority =
            Authority::from_str(&authority).map_err(|e| UpstreamError::InvalidUrl(e.to_string()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self {
            client,
            authority,
            timeout,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Target URI for an inbound request URI.
    pub fn target_uri(&self, inbound: &Uri) -> Uri {
        let path_and_query = inbound
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        let mut parts = inbound.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        parts.path_and_query = Some(path_and_query);
        Uri::from_parts(parts).unwrap_or_else(|_| inbound.clone())
    }
}

/// Handler forwarding every request to the wrapped application.
pub async fn forward(State(upstream): State<Upstream>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();
    parts.uri = upstream.target_uri(&parts.uri);
    let path = parts.uri.path().to_string();

    let pending = upstream.client.request(Request::from_parts(parts, body));
    match tokio::time::timeout(upstream.timeout, pending).await {
        Ok(Ok(response)) => relay(response),
        Ok(Err(e)) => {
            tracing::error!(error = %e, path = %path, upstream = %upstream.authority, "Upstream request failed");
            downstream_fault()
        }
        Err(_) => {
            tracing::error!(
                path = %path,
                upstream = %upstream.authority,
                timeout_secs = upstream.timeout.as_secs_f64(),
                "Upstream did not answer in time"
            );
            downstream_fault()
        }
    }
}

/// Stream the application's response back unchanged.
fn relay(response: hyper::Response<Incoming>) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body)).into_response()
}
