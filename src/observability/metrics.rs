//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shield_requests_total` (counter): requests by outcome (forwarded, rejected, unprotected)
//! - `shield_rejections_total` (counter): rejections by reason (general, auth, lockout, malformed, too_large)
//! - `shield_fail_open_total` (counter): checks skipped because of a fault, by stage
//! - `shield_login_outcomes_total` (counter): observed login results
//! - `shield_tracked_keys` (gauge): keys held per store after a sweep
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests need no setup
//! - Prometheus text format served on its own listener

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str) {
    metrics::counter!("shield_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_rejection(reason: &'static str) {
    metrics::counter!("shield_rejections_total", "reason" => reason).increment(1);
}

pub fn record_fail_open(stage: &'static str) {
    metrics::counter!("shield_fail_open_total", "stage" => stage).increment(1);
}

pub fn record_login_outcome(result: &'static str) {
    metrics::counter!("shield_login_outcomes_total", "result" => result).increment(1);
}

pub fn record_tracked_keys(store: &'static str, count: usize) {
    metrics::gauge!("shield_tracked_keys", "store" => store).set(count as f64);
}
