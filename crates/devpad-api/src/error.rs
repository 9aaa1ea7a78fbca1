use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use devpad_db::StoreError;

/// Request-level failure taxonomy. Every variant maps to exactly one HTTP
/// status; the body is always `{"msg": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    Auth(&'static str),
    #[error("Forbidden")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("{0}")]
    Conflict(&'static str),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "msg": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Forbidden => ApiError::Forbidden,
            StoreError::Conflict => ApiError::Conflict("User already exists"),
            other => {
                // Storage failures surface as a bare 500; details stay in the log.
                error!("storage failure: {}", other);
                ApiError::Internal
            }
        }
    }
}
