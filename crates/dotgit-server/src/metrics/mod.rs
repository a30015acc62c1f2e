//! Metrics module for the dotgit server.

pub mod http;
pub mod jobs;
pub mod setup;

pub use jobs::JobMetrics;
pub use setup::init_metrics;
