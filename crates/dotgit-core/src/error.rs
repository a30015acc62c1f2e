//! Error types for dotgit core types.
//!
//! Everything in this crate that can fail returns `Result<T, CoreError>`.
//! The errors describe invalid input at the edges of the system (job
//! definitions, URLs, server-supplied paths); runtime failures of a dump
//! live in the engine crate.
//!
//! # Example
//!
//! ```
//! use dotgit_core::{CoreError, Result};
//!
//! fn check_retries(retries: u32) -> Result<u32> {
//!     if retries > 10 {
//!         return Err(CoreError::invalid_job("retries", "at most 10 retries"));
//!     }
//!     Ok(retries)
//! }
//!
//! assert!(check_retries(3).is_ok());
//! assert!(check_retries(11).unwrap_err().is_invalid_job());
//! ```

use thiserror::Error;

/// Main error type for dotgit core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A dump job definition is incomplete or inconsistent.
    #[error("Invalid dump job field '{field}': {reason}")]
    InvalidJob {
        /// Field that failed validation
        field: String,
        /// Why it's invalid
        reason: String,
    },

    /// A source URL cannot be used for a dump.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as supplied
        url: String,
        /// Why it's invalid
        reason: String,
    },

    /// A relative path would escape its root directory.
    #[error("Unsafe path '{0}'")]
    UnsafePath(String),
}

impl CoreError {
    /// Creates an InvalidJob error.
    pub fn invalid_job(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidJob {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidUrl error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an UnsafePath error.
    pub fn unsafe_path(path: impl Into<String>) -> Self {
        Self::UnsafePath(path.into())
    }

    /// Returns true if this is a job validation error.
    pub fn is_invalid_job(&self) -> bool {
        matches!(self, Self::InvalidJob { .. })
    }

    /// Returns true if this is a URL error.
    pub fn is_invalid_url(&self) -> bool {
        matches!(self, Self::InvalidUrl { .. })
    }

    /// Returns true if this is a path traversal rejection.
    pub fn is_unsafe_path(&self) -> bool {
        matches!(self, Self::UnsafePath(_))
    }
}

/// Type alias for Results with CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
