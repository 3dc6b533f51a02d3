//! Detection ingestion and lookup handlers

use super::{parse_timestamp, required, PathsResponse, StatusResponse};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use facelog_core::{DetectionRecord, DetectionSubmission, TimeFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

/// Literal accepted in place of a timestamp to disable time filtering
const ALL_TIMES: &str = "All";

/// Detection event sent by a camera client
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct DetectionRequest {
    /// Recognized subject
    #[schema(example = "alice")]
    pub name: String,

    /// Originating camera
    #[schema(example = "cam_01")]
    pub camera_id: String,

    /// Detection time (RFC 3339)
    #[schema(value_type = Option<String>, example = "2025-03-14T12:00:00Z")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Face embedding, exactly 128 values
    pub embedding: Vec<f64>,

    /// Path returned by the upload endpoint
    #[schema(example = "snapshots/face_cam_01_1741953600000000000.jpg")]
    pub image_path: String,

    /// Recognition confidence in [0, 1]
    #[schema(example = 0.95)]
    pub confidence: f64,
}

impl From<DetectionRequest> for DetectionSubmission {
    fn from(req: DetectionRequest) -> Self {
        Self {
            name: req.name,
            camera_id: req.camera_id,
            timestamp: req.timestamp,
            embedding: req.embedding,
            image_path: req.image_path,
            confidence: req.confidence,
        }
    }
}

/// Record a face detection
#[utoipa::path(
    post,
    path = "/api/InputFaceRecognitionDetails",
    tag = "detections",
    request_body = DetectionRequest,
    responses(
        (status = 200, description = "Detection stored", body = StatusResponse),
        (status = 400, description = "Invalid detection", body = crate::error::ApiError),
        (status = 500, description = "Store failure", body = crate::error::ApiError)
    )
)]
pub async fn submit_detection(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DetectionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    state.service.submit_detection(req.into()).await?;

    Ok((
        StatusCode::OK,
        Json(StatusResponse {
            status: "OK".to_string(),
            message: "Face Recognition Details have been successfully added.".to_string(),
        }),
    ))
}

/// Query parameters for the camera lookup
#[derive(Debug, Deserialize, IntoParams)]
pub struct CameraQuery {
    /// Camera to search
    #[serde(rename = "cameraID")]
    pub camera_id: Option<String>,

    /// Center of the ±1 hour window (RFC 3339)
    pub timestamp: Option<String>,
}

/// Image paths from one camera within ±1 hour of a timestamp
#[utoipa::path(
    get,
    path = "/api/GetImagesByCamNumber",
    tag = "detections",
    params(CameraQuery),
    responses(
        (status = 200, description = "Matching image paths", body = PathsResponse),
        (status = 400, description = "Missing or malformed parameter", body = crate::error::ApiError),
        (status = 404, description = "No images in the window", body = crate::error::ApiError)
    )
)]
pub async fn images_by_camera(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CameraQuery>,
) -> Result<impl IntoResponse, AppError> {
    let camera_id = required(params.camera_id, "cameraID")?;
    let raw_timestamp = required(params.timestamp, "timestamp")?;
    tracing::debug!(%camera_id, %raw_timestamp, "Camera lookup");

    let base_time = parse_timestamp(&raw_timestamp)?;
    let paths = state
        .service
        .images_by_time_window(&camera_id, base_time)
        .await?;

    if paths.is_empty() {
        return Err(AppError::NotFound("images".to_string()));
    }
    Ok((StatusCode::OK, Json(PathsResponse::ok(paths))))
}

/// Query parameters for the subject lookup
#[derive(Debug, Deserialize, IntoParams)]
pub struct NameQuery {
    /// Subject to search
    pub name: Option<String>,

    /// Center of the ±1 hour window (RFC 3339), or `All`
    pub timestamp: Option<String>,
}

/// Time restriction encoded by the `timestamp` parameter
fn time_filter(timestamp: Option<&str>) -> Result<TimeFilter, AppError> {
    match timestamp {
        None | Some("") => Ok(TimeFilter::from_parts(None, false)),
        Some(ALL_TIMES) => Ok(TimeFilter::from_parts(None, true)),
        Some(raw) => Ok(TimeFilter::from_parts(Some(parse_timestamp(raw)?), false)),
    }
}

/// Image paths for one subject, optionally within ±1 hour of a timestamp
#[utoipa::path(
    get,
    path = "/api/GetImagesByName",
    tag = "detections",
    params(NameQuery),
    responses(
        (status = 200, description = "Matching image paths", body = PathsResponse),
        (status = 400, description = "Missing or malformed parameter", body = crate::error::ApiError),
        (status = 404, description = "No images for the subject", body = crate::error::ApiError)
    )
)]
pub async fn images_by_name(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NameQuery>,
) -> Result<impl IntoResponse, AppError> {
    let name = required(params.name, "name")?;
    let time = time_filter(params.timestamp.as_deref())?;
    tracing::debug!(%name, ?time, "Name lookup");

    let paths = state.service.images_by_name_and_time(&name, time).await?;

    if paths.is_empty() {
        return Err(AppError::NotFound("images".to_string()));
    }
    Ok((StatusCode::OK, Json(PathsResponse::ok(paths))))
}

/// Stored detection as consumed by the training client
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct EmbeddingDetails {
    #[schema(example = "alice")]
    pub name: String,

    #[serde(rename = "CameraID")]
    #[schema(example = "cam_01")]
    pub camera_id: String,

    #[schema(value_type = String, example = "2025-03-14T12:00:00Z")]
    pub timestamp: DateTime<Utc>,

    pub embedding: Vec<f64>,

    pub image_path: String,

    pub confidence: f64,
}

impl From<DetectionRecord> for EmbeddingDetails {
    fn from(record: DetectionRecord) -> Self {
        Self {
            name: record.name().to_string(),
            camera_id: record.camera_id().to_string(),
            timestamp: record.timestamp(),
            embedding: record.embedding().as_slice().to_vec(),
            image_path: record.image_path().to_string(),
            confidence: record.confidence(),
        }
    }
}

/// Embedding export response
#[derive(Debug, Serialize, ToSchema)]
pub struct EmbeddingsResponse {
    #[schema(example = "OK")]
    pub status: String,
    pub embeddings: Vec<EmbeddingDetails>,
}

/// Query parameters for the embedding export
#[derive(Debug, Deserialize, IntoParams)]
pub struct EmbeddingQuery {
    /// Subject whose embeddings to export
    pub name: Option<String>,
}

/// Every stored embedding for one subject
#[utoipa::path(
    get,
    path = "/api/FetchEmbeddingDetailsForModelTrainer",
    tag = "detections",
    params(EmbeddingQuery),
    responses(
        (status = 200, description = "Embeddings for the subject", body = EmbeddingsResponse),
        (status = 400, description = "Missing parameter", body = crate::error::ApiError),
        (status = 404, description = "No embeddings for the subject", body = crate::error::ApiError),
        (status = 500, description = "A stored document could not be decoded", body = crate::error::ApiError)
    )
)]
pub async fn embeddings_for_subject(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EmbeddingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let name = required(params.name, "name")?;
    tracing::debug!(%name, "Embedding export");

    let records = state.service.embeddings_for_subject(&name).await?;

    if records.is_empty() {
        return Err(AppError::NotFound("embeddings".to_string()));
    }
    Ok((
        StatusCode::OK,
        Json(EmbeddingsResponse {
            status: "OK".to_string(),
            embeddings: records.into_iter().map(EmbeddingDetails::from).collect(),
        }),
    ))
}
