//! API error type
//!
//! Every failure becomes `{"error": {"code", "message"}}` with a matching status.
//! An analysis either returns its complete result or one of these.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flm_core::CoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The modern server failed or was unreachable (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Rejected analysis parameters
    #[error(transparent)]
    Core(#[from] CoreError),

    /// flm-common error
    #[error("Common error: {0}")]
    Common(#[from] flm_common::Error),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<crate::client::ClientError> for ApiError {
    fn from(err: crate::client::ClientError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use flm_common::Error as Common;

        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Core(ref err) => (StatusCode::BAD_REQUEST, "INVALID_PARAMS", err.to_string()),
            ApiError::Common(ref err) => match err {
                Common::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
                Common::Database(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    err.to_string(),
                ),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR", err.to_string()),
            },
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
