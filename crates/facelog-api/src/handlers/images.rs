//! Snapshot upload handler

use super::PathsResponse;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use facelog_core::UploadedImage;
use std::sync::Arc;
use utoipa::ToSchema;

/// Form field carrying the camera identifier
const CAMERA_FIELD: &str = "camera_id";

/// Form field carrying image files; may repeat
const IMAGES_FIELD: &str = "images";

/// Multipart upload form
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Camera that captured the snapshots
    #[schema(example = "cam_01")]
    camera_id: String,

    /// One or more image files
    #[schema(value_type = Vec<String>, format = Binary)]
    images: Vec<Vec<u8>>,
}

fn malformed(e: MultipartError) -> AppError {
    AppError::BadRequest(format!("Malformed multipart form: {}", e.body_text()))
}

/// Store uploaded snapshots and return their paths
#[utoipa::path(
    post,
    path = "/api/UploadImageAndReturnPath",
    tag = "images",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Saved paths in upload order", body = PathsResponse),
        (status = 400, description = "No images or invalid camera", body = crate::error::ApiError),
        (status = 500, description = "Write failure", body = crate::error::ApiError)
    )
)]
pub async fn upload_images(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut camera_id = String::new();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        match field.name() {
            Some(CAMERA_FIELD) => {
                camera_id = field.text().await.map_err(malformed)?;
            }
            Some(IMAGES_FIELD) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                images.push(UploadedImage::new(file_name, bytes.to_vec()));
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown form field");
            }
        }
    }

    tracing::info!(%camera_id, count = images.len(), "Uploading snapshots");

    let paths = state.service.upload_images(&camera_id, images).await?;
    let paths = paths
        .iter()
        .map(|path| path.display().to_string())
        .collect();

    Ok((StatusCode::OK, Json(PathsResponse::ok(paths))))
}
