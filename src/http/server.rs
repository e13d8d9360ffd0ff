//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router forwarding everything to the wrapped application
//! - Wrap it in the protection layer
//! - Wire up ambient middleware (tracing, request ID, timeout)
//! - Bind server to listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ShieldConfig;
use crate::http::interceptor::protect;
use crate::http::request::UuidRequestId;
use crate::http::upstream::{forward, Upstream, UpstreamError};
use crate::security::{SecurityError, SecurityOptions, Shield};

/// Failure to assemble the server from configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("security options: {0}")]
    Security(#[from] SecurityError),

    #[error("upstream: {0}")]
    Upstream(#[from] UpstreamError),
}

/// HTTP server fronting the wrapped application.
pub struct HttpServer {
    router: Router,
    config: ShieldConfig,
    shield: Arc<Shield>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ShieldConfig) -> Result<Self, ServerError> {
        let options = SecurityOptions::from_config(&config.security)?;
        let shield = Arc::new(Shield::new(options)?);
        Self::with_shield(config, shield)
    }

    /// Create a server around an existing shield.
    pub fn with_shield(config: ShieldConfig, shield: Arc<Shield>) -> Result<Self, ServerError> {
        let upstream = Upstream::new(
            &config.upstream.url,
            Duration::from_secs(config.upstream.timeout_secs),
        )?;
        let router = Self::build_router(&config, upstream, shield.clone());
        Ok(Self {
            router,
            config,
            shield,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ShieldConfig, upstream: Upstream, shield: Arc<Shield>) -> Router {
        let app = Router::new()
            .route("/{*path}", any(forward))
            .route("/", any(forward))
            .with_state(upstream);

        protect(app, shield)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ShieldConfig {
        &self.config
    }

    /// The protection state shared with the interceptor.
    pub fn shield(&self) -> Arc<Shield> {
        self.shield.clone()
    }
}
