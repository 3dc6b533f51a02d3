//! API error handling
//!
//! Author: facelog maintainers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use facelog_core::FaceLogError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    #[schema(example = "BAD_REQUEST")]
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("No {resource} found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    Database(String),
    Timeout(String),
}

impl AppError {
    pub fn missing_param(name: &str) -> Self {
        Self::BadRequest(format!("Missing required parameter: {name}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, ApiError::not_found(&resource))
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal_error().with_details(msg),
            ),
            AppError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("DATABASE_ERROR", "Database operation failed").with_details(msg),
            ),
            AppError::Timeout(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                ApiError::new("TIMEOUT", "Database operation timed out").with_details(msg),
            ),
        };

        (status, Json(error)).into_response()
    }
}

impl From<FaceLogError> for AppError {
    fn from(err: FaceLogError) -> Self {
        match err {
            FaceLogError::Validation(e) => AppError::BadRequest(e.to_string()),
            FaceLogError::Store(msg) => AppError::Database(msg),
            e @ FaceLogError::Io { .. } => AppError::Internal(e.to_string()),
            FaceLogError::Decode(msg) => AppError::Internal(format!("Decode error: {msg}")),
            e @ FaceLogError::Timeout { .. } => AppError::Timeout(e.to_string()),
            FaceLogError::Config(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            FaceLogError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}
