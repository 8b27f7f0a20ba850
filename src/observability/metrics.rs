//! Metrics collection and exposition.
//!
//! # Metrics
//! - `waf_detections_total` (counter): detection calls by outcome, engine
//! - `waf_detection_duration_seconds` (histogram): time to first outcome
//! - `waf_no_engine_total` (counter): requests with no engine to ask
//! - `waf_engine_pool_idle` / `waf_engine_pool_open` (gauge): per-engine pool state
//! - `waf_upstream_requests_total` (counter): forwarded requests by method, status
//! - `waf_upstream_duration_seconds` (histogram): upstream latency
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::load_balancer::PoolStats;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_detection(outcome: &'static str, engine: &str, start: Instant) {
    ::metrics::counter!(
        "waf_detections_total",
        "outcome" => outcome,
        "engine" => engine.to_string()
    )
    .increment(1);
    ::metrics::histogram!("waf_detection_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_no_backend() {
    ::metrics::counter!("waf_no_engine_total").increment(1);
}

pub fn record_pool_state(engine: &str, stats: PoolStats) {
    ::metrics::gauge!("waf_engine_pool_idle", "engine" => engine.to_string())
        .set(stats.idle as f64);
    ::metrics::gauge!("waf_engine_pool_open", "engine" => engine.to_string())
        .set(stats.open as f64);
}

pub fn record_upstream(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "waf_upstream_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("waf_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}
