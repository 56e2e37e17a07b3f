//! Application metrics for Prometheus monitoring.
//!
//! The job system records through the `metrics` facade; this module installs
//! the Prometheus recorder that backs it and renders the scrape output.

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!("jobs_submitted_total", "Uploads accepted as jobs");
    describe_counter!(
        "jobs_finished_total",
        "Jobs that reached a terminal state, by outcome"
    );
    describe_counter!(
        "jobs_expired_total",
        "Finished jobs removed after the retention window without a download"
    );
    describe_counter!("downloads_total", "Artifacts handed out for download");
    describe_gauge!("jobs_active", "Jobs currently held in memory");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let first = init_metrics();
        let second = init_metrics();
        // Another test may have installed it first; either way only one wins.
        assert!(!(first && second));
        assert!(render_metrics().is_some());
    }
}
