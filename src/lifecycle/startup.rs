//! Startup orchestration.
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Protection state is built before the listener binds
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ShieldConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Build, bind and serve until a termination signal arrives.
pub async fn run(config: ShieldConfig) -> Result<(), StartupError> {
    let server = HttpServer::new(config.clone())?;
    let options = server.shield().options().clone();
    tracing::info!(
        general_capacity = options.general_capacity,
        general_window_secs = options.general_window.as_secs(),
        auth_capacity = options.auth_capacity,
        auth_window_secs = options.auth_window.as_secs(),
        max_login_attempts = options.max_login_attempts,
        login_window_secs = options.login_window.as_secs(),
        login_success = ?options.login_success,
        "Protection configured"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::shutdown_on_signal(shutdown));

    server
        .run(listener, server_shutdown)
        .await
        .map_err(StartupError::Serve)
}
