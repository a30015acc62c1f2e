//! Liveness and capacity report.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub version: &'static str,
    /// Configured worker count.
    pub workers: usize,
    /// Workers not running a dump.
    pub idle_workers: usize,
    /// Jobs that are pending or running.
    pub active_jobs: usize,
}

impl HealthResponse {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            workers: state.settings().workers,
            idle_workers: state.pool().idle_workers(),
            active_jobs: state.pool().registry().active(),
        }
    }
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_state(&state))
}
