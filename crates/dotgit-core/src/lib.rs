//! dotgit Core - Domain types
//!
//! This crate provides the foundational types shared by the dump engine and
//! the job service: dump job definitions, outcomes, URL normalization and the
//! path traversal guard.

pub mod error;
pub mod job;
pub mod outcome;
pub mod path;
pub mod url;

pub use error::{CoreError, Result};
pub use job::{ClientCertificate, DumpJob, DumpJobBuilder};
pub use outcome::{DumpOutcome, JobStatus};
pub use path::{PathGuard, sanitize_dir_name};
pub use url::{destination_name, normalize_url};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }

    #[test]
    fn version_is_semver() {
        let v = version();
        assert_eq!(v.split('.').count(), 3, "Version should be semver");
    }
}
