//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gate metrics (requests, auth, crediting, unlocks)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gate_requests_total` (counter): total requests by method, route, status
//! - `gate_request_duration_seconds` (histogram): latency distribution
//! - `gate_auth_total` (counter): authentication attempts by outcome
//! - `gate_purchases_total` (counter): purchase submissions by outcome
//! - `gate_credits_granted_total` (counter): credits added to ledgers
//! - `gate_unlocks_total` (counter): unlock attempts by outcome
//! - `gate_rate_limited_total` (counter): requests rejected by rate limiting
//! - `gate_chain_healthy` (gauge): 1=RPC reachable, 0=unreachable

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!("gate_requests_total", "Total HTTP requests handled");
            describe_histogram!(
                "gate_request_duration_seconds",
                "HTTP request latency in seconds"
            );
            describe_counter!("gate_auth_total", "Wallet authentication attempts by outcome");
            describe_counter!("gate_purchases_total", "Purchase submissions by outcome");
            describe_counter!("gate_credits_granted_total", "Credits added to ledgers");
            describe_counter!("gate_unlocks_total", "Chapter unlock attempts by outcome");
            describe_counter!("gate_rate_limited_total", "Requests rejected by rate limiting");
            describe_gauge!("gate_chain_healthy", "Blockchain RPC reachability");
            tracing::info!(address = %addr, "Metrics exporter started");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install metrics exporter");
        }
    }
}

/// Record a completed HTTP request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    counter!(
        "gate_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gate_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a wallet authentication attempt.
pub fn record_auth(outcome: &'static str) {
    counter!("gate_auth_total", "outcome" => outcome).increment(1);
}

/// Record a purchase verification attempt.
pub fn record_purchase(outcome: &'static str) {
    counter!("gate_purchases_total", "outcome" => outcome).increment(1);
}

/// Record credits granted to a ledger.
pub fn record_credits_granted(amount: u64) {
    counter!("gate_credits_granted_total").increment(amount);
}

/// Record a chapter unlock attempt.
pub fn record_unlock(outcome: &'static str) {
    counter!("gate_unlocks_total", "outcome" => outcome).increment(1);
}

/// Record a rate-limited request.
pub fn record_rate_limited(scope: &'static str) {
    counter!("gate_rate_limited_total", "scope" => scope).increment(1);
}

/// Record blockchain RPC health.
pub fn record_chain_health(healthy: bool) {
    gauge!("gate_chain_healthy").set(if healthy { 1.0 } else { 0.0 });
}
