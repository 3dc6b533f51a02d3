//! API route definitions
//!
//! Author: facelog maintainers

use crate::handlers::{detections, images};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Detection and snapshot endpoints, mounted under `/api`
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/InputFaceRecognitionDetails",
            post(detections::submit_detection),
        )
        .route("/UploadImageAndReturnPath", post(images::upload_images))
        .route("/GetImagesByCamNumber", get(detections::images_by_camera))
        .route("/GetImagesByName", get(detections::images_by_name))
        .route(
            "/FetchEmbeddingDetailsForModelTrainer",
            get(detections::embeddings_for_subject),
        )
}
