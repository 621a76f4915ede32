//! Application Error Types
//!
//! Centralized error handling with Axum integration for the HTTP surface and
//! a separate taxonomy for gateway event handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type for repositories and HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, 10003, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, 10006, "Rate limited".into()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
        };

        let body = ErrorResponse { code, message };

        (status, Json(body)).into_response()
    }
}

/// Error taxonomy for gateway event handling.
///
/// Every failed client event is reported back to the sender only, as an
/// `error` event carrying the code and message; other connected parties
/// observe nothing.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl EventError {
    /// Stable machine-readable code sent to the client.
    pub fn code(&self) -> &'static str {
        match self {
            EventError::Validation(_) => "VALIDATION_ERROR",
            EventError::Authorization(_) => "AUTHORIZATION_ERROR",
            EventError::NotFound(_) => "NOT_FOUND",
            EventError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Message safe to show to the client. Storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            EventError::Storage(e) => {
                tracing::error!("Storage error during event handling: {}", e);
                "Operation failed".into()
            }
            other => other.to_string(),
        }
    }
}

impl From<AppError> for EventError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => EventError::NotFound(msg),
            other => EventError::Storage(other.to_string()),
        }
    }
}
