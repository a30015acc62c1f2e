//! Dump job metrics recording.

use std::time::Duration;

use dotgit_core::JobStatus;
use metrics::{counter, gauge, histogram};

/// Describes the job metrics. Call once at start-up.
pub fn register_job_metrics() {
    metrics::describe_counter!("dotgit_jobs_submitted_total", "Total number of submitted dumps");
    metrics::describe_counter!(
        "dotgit_jobs_completed_total",
        "Total number of finished dumps by status"
    );
    metrics::describe_gauge!("dotgit_jobs_running", "Dumps currently running");
    metrics::describe_histogram!("dotgit_job_duration_seconds", "Dump duration in seconds");
    metrics::describe_histogram!("dotgit_job_leaks", "Leaks found per scanned dump");
}

/// Records job lifecycle metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobMetrics;

impl JobMetrics {
    pub fn record_submitted(&self) {
        counter!("dotgit_jobs_submitted_total").increment(1);
    }

    pub fn record_started(&self) {
        gauge!("dotgit_jobs_running").increment(1.0);
    }

    pub fn record_finished(&self, status: JobStatus, duration: Duration) {
        gauge!("dotgit_jobs_running").decrement(1.0);
        counter!("dotgit_jobs_completed_total", "status" => status.as_str()).increment(1);
        histogram!("dotgit_job_duration_seconds", "status" => status.as_str())
            .record(duration.as_secs_f64());
    }

    /// Counts a job that ended before it ever ran.
    pub fn record_dropped(&self, status: JobStatus) {
        counter!("dotgit_jobs_completed_total", "status" => status.as_str()).increment(1);
    }

    pub fn record_leaks(&self, count: usize) {
        histogram!("dotgit_job_leaks").record(count as f64);
    }
}
