//! Error types for the gateway
//!
//! This module defines custom error types used throughout the application.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid signature")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Upstream network error: {0}")]
    UpstreamNetwork(String),

    #[error("Upstream overloaded: {0}")]
    UpstreamOverloaded(String),

    #[error("Upstream HTTP error {status}")]
    UpstreamHttp { status: u16, body: String },

    #[error("Upstream error response: {message} ({code})")]
    UpstreamContent { code: String, message: String },

    #[error("Response normalization failed: {0}")]
    Normalization(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
///
/// Every client-facing error renders this flat shape; `retry_after` is only
/// populated on 503 so clients know when to come back.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details, retry_after) = match &self {
            AppError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone(), None, None)
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid signature".to_string(),
                None,
                None,
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests. Please slow down.".to_string(),
                None,
                None,
            ),
            AppError::UpstreamNetwork(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream request failed".to_string(),
                Some(msg.clone()),
                None,
            ),
            AppError::UpstreamOverloaded(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable. Please try again in a few moments.".to_string(),
                None,
                Some(30),
            ),
            AppError::UpstreamHttp { status, body } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream request failed".to_string(),
                Some(format!("status {}: {}", status, body)),
                None,
            ),
            AppError::UpstreamContent { code, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error response from upstream API".to_string(),
                Some(format!("Error message: {} with code: {}", message, code)),
                None,
            ),
            AppError::Normalization(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), None, None)
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while processing your request".to_string(),
                None,
                None,
            ),
        };

        let body = ErrorResponse {
            error,
            details,
            retry_after,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
