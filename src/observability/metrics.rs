//! Metrics collection and exposition.
//!
//! # Metrics
//! - `payout_credits_total` (counter): earnings credits accepted
//! - `payout_conversions_total` (counter): conversion attempts by outcome
//!   (`committed`, `rolled_back`, `pending`)
//!
//! # Design Decisions
//! - Low-overhead updates via the `metrics` facade
//! - Prometheus exposition on a dedicated listener, enabled by config

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count an accepted earnings credit.
pub fn record_credit() {
    metrics::counter!("payout_credits_total").increment(1);
}

/// Count a conversion attempt by terminal outcome.
pub fn record_conversion(outcome: &'static str) {
    metrics::counter!("payout_conversions_total", "outcome" => outcome).increment(1);
}
