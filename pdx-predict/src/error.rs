//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request field validation failed (400), with per-field messages
    #[error("Invalid input")]
    Validation { details: BTreeMap<String, String> },

    /// Every requested modality failed (400); details name the stages
    #[error("No valid prediction")]
    NoPrediction { details: BTreeMap<String, String> },

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<crate::pipeline::PipelineError> for ApiError {
    fn from(err: crate::pipeline::PipelineError) -> Self {
        match err {
            crate::pipeline::PipelineError::NoPrediction { details } => {
                ApiError::NoPrediction { details }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation { details } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid input", "details": details }),
            ),
            ApiError::NoPrediction { details } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "No valid prediction", "details": details }),
            ),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
            ApiError::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            ),
            ApiError::Other(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
