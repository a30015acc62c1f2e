//! Job records as reported by the status endpoints.

use chrono::{DateTime, Utc};
use dotgit_core::{DumpOutcome, JobStatus};
use serde::Serialize;

use super::leaks::Leak;

/// Status record of one submitted dump.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    pub url: String,
    pub status: JobStatus,
    /// Destination directory.
    pub path: String,
    /// Outcome once the job finished.
    pub result: Option<DumpOutcome>,
    pub leaks: Vec<Leak>,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Creates a pending record.
    pub fn pending(id: impl Into<String>, url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            status: JobStatus::Pending,
            path: path.into(),
            result: None,
            leaks: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Records the outcome and the matching terminal status.
    pub fn finish(&mut self, outcome: DumpOutcome) {
        self.status = JobStatus::from_outcome(&outcome);
        self.result = Some(outcome);
    }
}
