//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Interceptor, limiters and guard produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Throttling is a warning, never an error
//! - Lockouts and suspicious input carry a distinct field for alerting
//! - Request ID flows through all log lines via the trace span

pub mod logging;
pub mod metrics;
