//! Terminal values of a dump job.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of a dump job, produced exactly once by the orchestrator.
///
/// On the wire it is the flat record `{status, path, url}`. For errors the
/// `path` field carries the error text and `url` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "OutcomeRecord", try_from = "OutcomeRecord")]
pub enum DumpOutcome {
    /// The repository was reconstructed into `path`.
    Success {
        /// Destination directory.
        path: String,
        /// Normalized source URL.
        url: String,
    },
    /// The dump failed.
    Error {
        /// Human-readable failure message.
        message: String,
    },
}

impl DumpOutcome {
    /// Creates a success outcome.
    pub fn success(path: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Success {
            path: path.into(),
            url: url.into(),
        }
    }

    /// Creates an error outcome.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns true for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the wire tag (`success` or `error`).
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
        }
    }
}

impl fmt::Display for DumpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { path, url } => write!(f, "dumped {url} into {path}"),
            Self::Error { message } => f.write_str(message),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct OutcomeRecord {
    status: String,
    path: String,
    #[serde(default)]
    url: String,
}

impl From<DumpOutcome> for OutcomeRecord {
    fn from(outcome: DumpOutcome) -> Self {
        match outcome {
            DumpOutcome::Success { path, url } => Self {
                status: "success".into(),
                path,
                url,
            },
            DumpOutcome::Error { message } => Self {
                status: "error".into(),
                path: message,
                url: String::new(),
            },
        }
    }
}

impl TryFrom<OutcomeRecord> for DumpOutcome {
    type Error = String;

    fn try_from(record: OutcomeRecord) -> Result<Self, String> {
        match record.status.as_str() {
            "success" => Ok(Self::Success {
                path: record.path,
                url: record.url,
            }),
            "error" => Ok(Self::Error {
                message: record.path,
            }),
            other => Err(format!("unknown outcome status '{other}'")),
        }
    }
}

/// Lifecycle state of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Accepted, waiting for a worker.
    Pending,
    /// A worker is running the dump.
    Running,
    /// Finished with a success outcome.
    Success,
    /// Finished with an error outcome, was cancelled, or panicked.
    Failure,
}

impl JobStatus {
    /// Returns true once the job can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    /// Maps a finished outcome to its terminal status.
    pub fn from_outcome(outcome: &DumpOutcome) -> Self {
        if outcome.is_success() {
            Self::Success
        } else {
            Self::Failure
        }
    }

    /// Returns the uppercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_serializes_flat() {
        let outcome = DumpOutcome::success("/out/example.com", "http://example.com");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({"status": "success", "path": "/out/example.com", "url": "http://example.com"})
        );
    }

    #[test]
    fn test_error_carries_message_in_path() {
        let outcome = DumpOutcome::error("error: http://h/.git/HEAD is not a git HEAD file");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["path"], "error: http://h/.git/HEAD is not a git HEAD file");
        assert_eq!(value["url"], "");
    }

    #[test]
    fn test_deserialize_rejects_unknown_status() {
        let result: Result<DumpOutcome, _> =
            serde_json::from_value(json!({"status": "partial", "path": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_error() {
        let outcome: DumpOutcome =
            serde_json::from_value(json!({"status": "error", "path": "boom"})).unwrap();
        assert_eq!(outcome, DumpOutcome::error("boom"));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_job_status_wire_names() {
        assert_eq!(serde_json::to_value(JobStatus::Pending).unwrap(), "PENDING");
        assert_eq!(serde_json::to_value(JobStatus::Failure).unwrap(), "FAILURE");
        assert_eq!(JobStatus::Running.to_string(), "RUNNING");
    }

    #[test]
    fn test_job_status_from_outcome() {
        assert_eq!(
            JobStatus::from_outcome(&DumpOutcome::success("p", "u")),
            JobStatus::Success
        );
        assert_eq!(
            JobStatus::from_outcome(&DumpOutcome::error("e")),
            JobStatus::Failure
        );
        assert!(JobStatus::Failure.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
