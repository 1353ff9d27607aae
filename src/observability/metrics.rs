//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define monitor metrics (deliveries, queue churn, rate limits, health)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `sentinel_deliveries_total` (counter): delivery outcomes by result
//! - `sentinel_messages_deduplicated_total` (counter): dedupe cache hits
//! - `sentinel_messages_evicted_total` (counter): size-cap evictions
//! - `sentinel_messages_expired_total` (counter): lifetime expiries
//! - `sentinel_rate_limited_total` (counter): limit hits by layer
//! - `sentinel_degradation_level` (gauge): current level, 0=normal..4=critical
//! - `sentinel_ip_checks_total` (counter): lookup attempts by outcome
//! - `sentinel_ip_changes_total` (counter): detected address changes
//!
//! # Design Decisions
//! - One facade; callers never touch the metrics macros directly

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP scrape endpoint.
///
/// Failure to bind is logged, not fatal; the monitor runs without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics endpoint started"),
        Err(err) => tracing::error!(error = %err, "failed to start metrics endpoint"),
    }
}

/// Record one delivery outcome ("delivered" or "failed").
pub fn record_delivery(result: &'static str) {
    counter!("sentinel_deliveries_total", "result" => result).increment(1);
}

pub fn record_dedupe_hit() {
    counter!("sentinel_messages_deduplicated_total").increment(1);
}

pub fn record_eviction(count: u64) {
    counter!("sentinel_messages_evicted_total").increment(count);
}

pub fn record_expired(count: u64) {
    counter!("sentinel_messages_expired_total").increment(count);
}

/// Record a rate-limit hit at a limiting layer ("admission" or "transport").
pub fn record_rate_limited(layer: &'static str) {
    counter!("sentinel_rate_limited_total", "layer" => layer).increment(1);
}

pub fn record_degradation_level(level: u8) {
    gauge!("sentinel_degradation_level").set(level as f64);
}

/// Record one IP lookup attempt ("ok" or "error").
pub fn record_ip_check(outcome: &'static str) {
    counter!("sentinel_ip_checks_total", "outcome" => outcome).increment(1);
}

pub fn record_ip_change() {
    counter!("sentinel_ip_changes_total").increment(1);
}
