//! Metrics collection and exposition.
//!
//! # Metrics
//! - `verifier_queries_total` (counter): explorer queries by network, result
//! - `verifier_query_duration_seconds` (histogram): explorer latency by network
//! - `verifier_sessions_started_total` (counter): sessions by network
//! - `verifier_sessions_finished_total` (counter): sessions by network, outcome
//! - `verifier_active_sessions` (gauge): sessions currently polling
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one explorer query.
pub fn record_query(network: &str, result: &'static str, started: Instant) {
    counter!("verifier_queries_total", "network" => network.to_string(), "result" => result)
        .increment(1);
    histogram!("verifier_query_duration_seconds", "network" => network.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// Record a session that was accepted for verification.
pub fn record_session_started(network: &str) {
    counter!("verifier_sessions_started_total", "network" => network.to_string()).increment(1);
}

/// Record how a session ended.
pub fn record_session_finished(network: &str, outcome: &'static str) {
    counter!(
        "verifier_sessions_finished_total",
        "network" => network.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Track sessions with a running poll loop.
pub fn record_active_session(delta: f64) {
    gauge!("verifier_active_sessions").increment(delta);
}
