//! dotgit Server - job service around the dump engine.
//!
//! Accepts dump requests over HTTP, runs them on a bounded worker pool and
//! reports their status. Optionally hands finished dumps to gitleaks.

pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod settings;
pub mod state;

pub use error::AppError;
pub use handlers::health::HealthResponse;
pub use jobs::{DumpRunner, JobPool, JobRecord, JobRegistry};
pub use server::{API_PREFIX, create_router_with_state, run_server_with_state};
pub use settings::Settings;
pub use state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
