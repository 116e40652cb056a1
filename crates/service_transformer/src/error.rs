//! API error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors returned by the instrument endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Financial instruments have not been loaded yet")]
    NotInitialized,

    #[error("Financial instrument not found: {0}")]
    NotFound(String),

    #[error("A load is already in progress")]
    LoadInProgress,
}

impl ApiError {
    /// HTTP status of the error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::LoadInProgress => StatusCode::CONFLICT,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotInitialized => "NOT_INITIALIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::LoadInProgress => "LOAD_IN_PROGRESS",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));

        (self.status_code(), body).into_response()
    }
}
