//! Job lifecycle: records, registry, worker pool and secret scanning.

pub mod leaks;
pub mod record;
pub mod registry;
pub mod worker;

pub use leaks::{Gitleaks, Leak, ScanError, SecretScanner};
pub use record::JobRecord;
pub use registry::JobRegistry;
pub use worker::{DumpRunner, EngineRunner, JobPool};
