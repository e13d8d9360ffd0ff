//! Request Shield Library
//!
//! Inbound-request protection in front of an HTTP application: sliding-window
//! rate limits, a stricter budget for authentication routes, and a login
//! brute-force guard keyed by client and account.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::ShieldConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::{SecurityOptions, Shield};
