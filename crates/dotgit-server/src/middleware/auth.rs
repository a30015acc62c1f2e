//! Token authentication for the job API.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Rejects requests whose `Authorization` header is not a configured token.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match token {
        Some(token) if state.settings().accepts_token(token) => Ok(next.run(request).await),
        _ => {
            debug!("Rejected request to {}", request.uri().path());
            Err(AppError::Forbidden)
        },
    }
}
