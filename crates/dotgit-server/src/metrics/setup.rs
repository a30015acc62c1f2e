//! Metrics setup and initialization.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Histogram buckets in seconds, from fast HTTP requests up to long dumps.
const BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0,
    3600.0,
];

/// Installs the Prometheus recorder and returns the handle `/metrics` renders.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(BUCKETS)?
        .install_recorder()?;

    super::http::register_http_metrics();
    super::jobs::register_job_metrics();

    info!("Metrics system initialized");
    Ok(handle)
}

/// Builds a handle without installing a global recorder.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
