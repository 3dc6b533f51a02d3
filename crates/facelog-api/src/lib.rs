//! FaceLog API - REST server
//!
//! Accepts face-recognition detections from camera clients, stores snapshot
//! uploads, and serves lookups to dashboards and the model trainer.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document for every public endpoint
#[derive(OpenApi)]
#[openapi(
    info(
        title = "FaceLog API",
        description = "Face-recognition detection logging and retrieval"
    ),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::health::metrics,
        handlers::detections::submit_detection,
        handlers::images::upload_images,
        handlers::detections::images_by_camera,
        handlers::detections::images_by_name,
        handlers::detections::embeddings_for_subject,
    ),
    components(schemas(
        error::ApiError,
        handlers::StatusResponse,
        handlers::PathsResponse,
        handlers::health::HealthResponse,
        handlers::health::BuildInfo,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
        handlers::health::MetricsResponse,
        handlers::detections::DetectionRequest,
        handlers::detections::EmbeddingDetails,
        handlers::detections::EmbeddingsResponse,
        handlers::images::UploadForm,
    )),
    tags(
        (name = "health", description = "Liveness, readiness and counters"),
        (name = "detections", description = "Detection ingestion and lookups"),
        (name = "images", description = "Snapshot uploads")
    )
)]
pub struct ApiDoc;

/// Build the CORS layer from the configured origins
///
/// `*` allows any origin; otherwise only the listed origins that parse as
/// header values are allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-auth-token"),
            header::AUTHORIZATION,
        ])
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let body_limit = state.config.server.max_body_size;

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api", routes::api_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
