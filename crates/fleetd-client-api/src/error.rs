//! Maps `fleetd_core::SupervisorError` (and transport-local failures) onto
//! HTTP status codes and the `{"detail": "..."}` body shape, the same
//! structure `original_source/app/main.py`'s `HTTPException(status_code,
//! detail=...)` produces.

use axum::response::{IntoResponse, Response};
use axum::Json;
use fleetd_core::SupervisorError;
use http::StatusCode;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("authentication required")]
    AuthMissing,
    #[error("invalid credentials")]
    AuthInvalid,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::AuthMissing => StatusCode::UNAUTHORIZED,
            ApiError::AuthInvalid => StatusCode::FORBIDDEN,
            ApiError::Supervisor(err) => match err {
                SupervisorError::NotFound(_) => StatusCode::NOT_FOUND,
                SupervisorError::AlreadyExists(_)
                | SupervisorError::AlreadyStarted
                | SupervisorError::StillRunning => StatusCode::BAD_REQUEST,
                SupervisorError::InvalidName(_) | SupervisorError::NegativeTail | SupervisorError::EmptyCommand => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                SupervisorError::NotRunning | SupervisorError::StdinClosed => StatusCode::CONFLICT,
                SupervisorError::SpawnFailed(_) | SupervisorError::WriteFailed(_) => {
                    tracing::error!(error = %err, "internal error serving request");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        };
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}
