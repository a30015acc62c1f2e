//! Dump job endpoints.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dotgit_core::{DumpJob, JobStatus, destination_name};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::jobs::JobRecord;
use crate::state::AppState;

/// Body of `POST /api/v1/git`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub url: String,
    /// Accepted for compatibility; dumps fetch sequentially.
    #[serde(default)]
    pub jobs: Option<u32>,
    #[serde(default)]
    pub retry: Option<u32>,
    /// Per-request timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Path of a PKCS#12 client certificate on the server.
    #[serde(default, rename = "clientCertP12")]
    pub client_cert_p12: Option<String>,
    #[serde(default, rename = "clientCertP12Password")]
    pub client_cert_p12_password: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

/// Response of an accepted submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    pub status: JobStatus,
    pub url: String,
    pub path: String,
}

/// Response of a cancellation request.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub id: String,
    pub cancelled: bool,
}

impl SubmitRequest {
    /// Turns the request into a job writing below the configured output root.
    pub fn into_job(self, state: &AppState) -> Result<DumpJob, AppError> {
        let settings = state.settings();
        let dest = settings.output_root.join(destination_name(&self.url)?);

        let mut builder = DumpJob::builder()
            .url(self.url)
            .destination(dest)
            .timeout(Duration::from_secs(self.timeout.unwrap_or(settings.timeout_secs)))
            .retries(self.retry.unwrap_or(settings.retries))
            .jobs(self.jobs.unwrap_or(1))
            .headers(self.headers)
            .git_executable(&settings.git_executable);

        if let Some(cert) = self.client_cert_p12 {
            builder =
                builder.client_certificate(cert, self.client_cert_p12_password.unwrap_or_default());
        }
        if let Some(proxy) = self.proxy {
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }
}

/// POST /api/v1/git
/// Queues a dump and returns its id.
#[instrument(skip_all)]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Response, AppError> {
    let job = request.into_job(&state)?;
    let record = state.pool().submit(job).await;

    info!(id = %record.id, url = %record.url, "Job submitted");
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            id: record.id,
            status: record.status,
            url: record.url,
            path: record.path,
        }),
    )
        .into_response())
}

/// GET /api/v1/git/status/{id}
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, AppError> {
    state
        .pool()
        .registry()
        .get(&id)
        .await
        .map(Json)
        .ok_or(AppError::NotFound(id))
}

/// GET /api/v1/git/tasks
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobRecord>> {
    Json(state.pool().registry().list())
}

/// DELETE /api/v1/git/{id}
/// Requests cancellation of a pending or running job.
#[instrument(skip(state))]
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    let registry = state.pool().registry();
    if registry.get(&id).await.is_none() {
        return Err(AppError::NotFound(id));
    }

    let cancelled = registry.cancel(&id);
    info!(cancelled, "Cancellation requested");
    Ok(Json(CancelResponse { id, cancelled }))
}
