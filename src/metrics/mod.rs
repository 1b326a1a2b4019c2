//! # Metrics
//!
//! Prometheus export for reconciliation and record-store traffic.
//!
//! **Counters:**
//! - `care_shim_reports_total{outcome}` - Reports classified as updated or skipped
//! - `care_shim_patch_failures_total` - Failed patch attempts (each retry counts)
//! - `care_shim_records_dropped_total` - Store rows dropped by validation
//! - `care_shim_store_requests_total{method}` - Requests sent to the record store
//!
//! **Histograms:**
//! - `care_shim_reconcile_duration_seconds` - Wall time of one reconciliation call

pub mod handler;

pub use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder.
///
/// Fails if a recorder is already installed (e.g. a second call in tests).
pub fn setup_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::Matcher;

    // Patch sequences sleep between batches, so reconciliations run long.
    let duration_buckets = &[0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("care_shim_reconcile_duration_seconds".to_string()),
            duration_buckets,
        )?
        .install_recorder()?;

    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(
        "care_shim_reports_total",
        "Care-provided reports by outcome"
    );
    metrics::describe_counter!(
        "care_shim_patch_failures_total",
        "Failed patch attempts against the record store"
    );
    metrics::describe_counter!(
        "care_shim_records_dropped_total",
        "Record store rows dropped because they failed validation"
    );
    metrics::describe_counter!(
        "care_shim_store_requests_total",
        "Requests sent to the record store"
    );
    metrics::describe_histogram!(
        "care_shim_reconcile_duration_seconds",
        metrics::Unit::Seconds,
        "Duration of one reconciliation call"
    );
}
