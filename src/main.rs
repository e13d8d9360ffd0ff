//! Request Shield
//!
//! A protection layer that sits in front of an HTTP application.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ request id → trace → timeout
//!                          │
//!                          ▼
//!                      hardening headers → panic guard
//!                          │
//!                          ▼
//!                      interceptor ── 429 / 400 ──▶ Client
//!                      (identity, general limit, inspection,
//!                       auth limit, brute-force guard)
//!                          │
//!                          ▼
//!                      upstream ─────────────────────▶ Wrapped application
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use request_shield::config::{load_config, validate_config, ShieldConfig};
use request_shield::lifecycle::startup;
use request_shield::observability::logging;

#[derive(Parser)]
#[command(name = "request-shield")]
#[command(about = "Rate limiting and brute-force protection in front of an HTTP application", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            let config = ShieldConfig::default();
            if let Err(errors) = validate_config(&config) {
                for error in errors {
                    eprintln!("{}", error);
                }
                return ExitCode::FAILURE;
            }
            config
        }
    };

    if cli.check {
        println!("configuration ok");
        return ExitCode::SUCCESS;
    }

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        request_timeout_secs = config.timeouts.request_secs,
        "request-shield starting"
    );

    match startup::run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup error");
            ExitCode::FAILURE
        }
    }
}
