//! Error types for the dump engine.

use std::path::PathBuf;

use dotgit_core::CoreError;

/// Errors that can occur while reconstructing a repository.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// The request could not be completed at the transport level
    /// (connect failure, timeout, TLS) after all retries.
    #[error("transport error for {path}: {reason}")]
    Transport { path: String, reason: String },

    /// The server answered, but not with usable content.
    #[error("invalid response for {path}: {reason}")]
    InvalidResponse { path: String, reason: String },

    /// The probe found no usable `.git/HEAD`.
    #[error("{0}")]
    Probe(String),

    /// A loose object, index or pack could not be decoded.
    #[error("decode error in {what}: {reason}")]
    Decode { what: String, reason: String },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input at the domain level (unsafe path, bad job).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The checkout command failed.
    #[error("checkout failed: {0}")]
    Checkout(String),

    /// Another job holds the destination directory.
    #[error("destination {} is locked by another job", .0.display())]
    Locked(PathBuf),

    /// The job was cancelled between two fetches.
    #[error("dump cancelled")]
    Cancelled,

    /// The HTTP client could not be configured.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A blocking task panicked or was aborted.
    #[error("task failed: {0}")]
    Task(String),
}

impl DumpError {
    /// Creates a new transport error.
    pub fn transport(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new invalid response error.
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new decode error.
    pub fn decode(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns true if this is a decode error.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

impl From<tokio::task::JoinError> for DumpError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Type alias for Results with DumpError.
pub type Result<T> = std::result::Result<T, DumpError>;
