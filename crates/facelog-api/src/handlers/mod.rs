//! API handlers

pub mod detections;
pub mod health;
pub mod images;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;

/// Success response carrying a message
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "OK")]
    pub status: String,
    pub message: String,
}

/// Success response carrying image paths
#[derive(Debug, Serialize, ToSchema)]
pub struct PathsResponse {
    #[schema(example = "OK")]
    pub status: String,
    #[schema(example = json!(["snapshots/face_cam_01_1741953600000000000.jpg"]))]
    pub paths: Vec<String>,
}

impl PathsResponse {
    pub fn ok(paths: Vec<String>) -> Self {
        Self {
            status: "OK".to_string(),
            paths,
        }
    }
}

/// Parse an RFC 3339 query parameter
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| AppError::BadRequest("Invalid timestamp format".to_string()))
}

/// Treat an absent or empty query parameter as missing
pub(crate) fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::missing_param(name))
}
