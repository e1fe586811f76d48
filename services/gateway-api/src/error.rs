//! Error types for the gateway API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use hermes_types::HermesError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// API error type: the shared taxonomy plus request-shape failures
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Hermes(#[from] HermesError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Hermes(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Hermes(err) => err.error_code(),
            Self::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl From<hermes_db::DbError> for ApiError {
    fn from(err: hermes_db::DbError) -> Self {
        Self::Hermes(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log server-side failures; auth/validation noise stays at debug
        if status.is_server_error() {
            tracing::error!(error = ?self, "internal API error");
        } else {
            tracing::debug!(error = ?self, "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
