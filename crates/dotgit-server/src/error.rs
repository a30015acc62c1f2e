use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dotgit_core::CoreError;
use serde::Serialize;
use serde_json::json;

/// Errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No job with this id.
    #[error("job {0} not found")]
    NotFound(String),

    /// The request cannot be turned into a dump job.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or unknown token.
    #[error("access denied")]
    Forbidden,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            AppError::Forbidden => {
                return (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "reason": "Access Denied" })),
                )
                    .into_response();
            },
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_core_errors_are_bad_requests() {
        let err: AppError = dotgit_core::destination_name("ftp://h").unwrap_err().into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
