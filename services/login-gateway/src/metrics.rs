//! Prometheus metrics exposition
//!
//! - `handshake_begin_total` (counter): label `outcome`
//! - `handshake_complete_total` (counter): label `outcome`
//! - `session_resolve_total` (counter): label `outcome`
//! - `handshake_phase_duration_seconds` (histogram): label `phase`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Configures `handshake_phase_duration_seconds` with explicit buckets so
/// it renders as a histogram (with `_bucket` lines for
/// `histogram_quantile()` queries) rather than the default summary. The
/// range covers a local in-memory lookup up to a slow provider round-trip.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "handshake_phase_duration_seconds".to_string(),
            ),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a handshake begin with its outcome (an error code or "ok").
pub fn record_begin(outcome: &str, duration_secs: f64) {
    metrics::counter!("handshake_begin_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("handshake_phase_duration_seconds", "phase" => "begin")
        .record(duration_secs);
}

/// Record a handshake completion with its outcome.
pub fn record_complete(outcome: &str, duration_secs: f64) {
    metrics::counter!("handshake_complete_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("handshake_phase_duration_seconds", "phase" => "complete")
        .record(duration_secs);
}

/// Record a session resolution with its outcome.
pub fn record_resolve(outcome: &str) {
    metrics::counter!("session_resolve_total", "outcome" => outcome.to_string()).increment(1);
}
