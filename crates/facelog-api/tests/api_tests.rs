//! API Integration Tests
//!
//! Every test runs against the in-memory detection store and a temporary
//! snapshot directory, so no external services are needed.
//!
//! Author: facelog maintainers

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use facelog_api::{create_router, state::AppState};
use facelog_core::{
    AppConfig, DetectionFilter, DetectionRecord, DetectionStore, DocumentCursor, FaceLogError,
    FaceLogService, EMBEDDING_DIMENSION,
};
use facelog_store::{LocalImageStore, MemoryDetectionStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "facelog-test-boundary";

struct TestApp {
    router: Router,
    store: MemoryDetectionStore,
    snapshots: std::path::PathBuf,
    _tmp: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let snapshots = tmp.path().join("snapshots");
        let store = MemoryDetectionStore::new();

        let service = FaceLogService::new(
            Arc::new(store.clone()),
            Arc::new(LocalImageStore::new(&snapshots)),
        );
        let state = Arc::new(AppState::new(AppConfig::default(), Arc::new(service)));

        Self {
            router: create_router(state),
            store,
            snapshots,
            _tmp: tmp,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn submit(&self, body: Value) -> (StatusCode, Value) {
        self.send(create_json_request(
            "POST",
            "/api/InputFaceRecognitionDetails",
            Some(body),
        ))
        .await
    }
}

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn detection(name: &str, camera_id: &str, timestamp: &str, image_path: &str) -> Value {
    json!({
        "name": name,
        "camera_id": camera_id,
        "timestamp": timestamp,
        "embedding": vec![0.25; EMBEDDING_DIMENSION],
        "image_path": image_path,
        "confidence": 0.9
    })
}

/// Build a multipart body from `(field, file_name, content)` parts
fn multipart_request(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let mut body = Vec::new();
    for (field, file_name, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/UploadImageAndReturnPath")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let (status, json) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let app = TestApp::new();

    let (status, json) = app.get("/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["store"], true);
}

#[tokio::test]
async fn test_metrics_count_requests_and_errors() {
    let app = TestApp::new();

    app.get("/health").await;
    app.get("/api/GetImagesByName").await;
    let (status, json) = app.get("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["total_requests"].as_u64().unwrap() >= 2);
    assert_eq!(json["client_errors"], 1);
    assert_eq!(json["server_errors"], 0);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new();

    let (status, json) = app.get("/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/GetImagesByCamNumber"].is_object());
}

// =============================================================================
// Detection Submission Tests
// =============================================================================

#[tokio::test]
async fn test_submit_detection() {
    let app = TestApp::new();

    let (status, json) = app
        .submit(detection("alice", "cam1", "2025-03-14T12:00:00Z", "a.jpg"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "OK");
    assert_eq!(
        json["message"],
        "Face Recognition Details have been successfully added."
    );
    assert_eq!(app.store.len().unwrap(), 1);
}

#[tokio::test]
async fn test_submit_rejects_invalid_detections() {
    let app = TestApp::new();

    let mut short_embedding = detection("alice", "cam1", "2025-03-14T12:00:00Z", "a.jpg");
    short_embedding["embedding"] = json!([0.1, 0.2]);

    let mut no_timestamp = detection("alice", "cam1", "2025-03-14T12:00:00Z", "a.jpg");
    no_timestamp.as_object_mut().unwrap().remove("timestamp");

    let mut bad_confidence = detection("alice", "cam1", "2025-03-14T12:00:00Z", "a.jpg");
    bad_confidence["confidence"] = json!(1.5);

    let empty_name = detection("", "cam1", "2025-03-14T12:00:00Z", "a.jpg");

    for body in [short_embedding, no_timestamp, bad_confidence, empty_name] {
        let (status, json) = app.submit(body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");
    }
    assert!(app.store.is_empty().unwrap());
}

#[tokio::test]
async fn test_submit_rejects_malformed_json() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/InputFaceRecognitionDetails")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.store.is_empty().unwrap());
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[tokio::test]
async fn test_images_by_camera_window() {
    let app = TestApp::new();
    for (camera, ts, path) in [
        ("cam1", "2025-03-14T11:00:00Z", "lower-bound.jpg"),
        ("cam1", "2025-03-14T12:30:00Z", "inside.jpg"),
        ("cam1", "2025-03-14T13:00:00Z", "upper-bound.jpg"),
        ("cam2", "2025-03-14T12:00:00Z", "other-camera.jpg"),
    ] {
        let (status, _) = app.submit(detection("alice", camera, ts, path)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = app
        .get("/api/GetImagesByCamNumber?cameraID=cam1&timestamp=2025-03-14T12:00:00Z")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "OK");
    assert_eq!(json["paths"], json!(["lower-bound.jpg", "inside.jpg"]));
}

#[tokio::test]
async fn test_images_by_camera_errors() {
    let app = TestApp::new();

    let (status, json) = app
        .get("/api/GetImagesByCamNumber?timestamp=2025-03-14T12:00:00Z")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Missing required parameter: cameraID");

    let (status, json) = app.get("/api/GetImagesByCamNumber?cameraID=cam1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Missing required parameter: timestamp");

    let (status, json) = app
        .get("/api/GetImagesByCamNumber?cameraID=cam1&timestamp=noon")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid timestamp format");

    let (status, json) = app
        .get("/api/GetImagesByCamNumber?cameraID=cam1&timestamp=2025-03-14T12:00:00Z")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_images_by_name_with_and_without_time() {
    let app = TestApp::new();
    app.submit(detection("bob", "cam1", "2025-03-14T12:00:00Z", "noon.jpg"))
        .await;
    app.submit(detection("bob", "cam2", "2025-03-15T12:00:00Z", "next-day.jpg"))
        .await;
    app.submit(detection("carol", "cam1", "2025-03-14T12:00:00Z", "carol.jpg"))
        .await;

    let (status, json) = app
        .get("/api/GetImagesByName?name=bob&timestamp=2025-03-14T12:10:00Z")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["paths"], json!(["noon.jpg"]));

    for uri in [
        "/api/GetImagesByName?name=bob&timestamp=All",
        "/api/GetImagesByName?name=bob",
    ] {
        let (status, json) = app.get(uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["paths"], json!(["noon.jpg", "next-day.jpg"]));
    }

    let (status, _) = app.get("/api/GetImagesByName?name=dave").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .get("/api/GetImagesByName?name=bob&timestamp=soon")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_images_by_name_skips_malformed_documents() {
    let app = TestApp::new();
    app.submit(detection("erin", "cam1", "2025-03-14T12:00:00Z", "good.jpg"))
        .await;
    app.store
        .insert_raw(json!({ "name": "erin", "image_path": 42 }))
        .unwrap();

    let (status, json) = app.get("/api/GetImagesByName?name=erin&timestamp=All").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["paths"], json!(["good.jpg"]));
}

#[tokio::test]
async fn test_images_by_camera_fails_on_malformed_document() {
    let app = TestApp::new();
    app.submit(detection("hana", "cam1", "2025-03-14T12:00:00Z", "good.jpg"))
        .await;
    app.store
        .insert_raw(json!({
            "name": "hana",
            "camera_id": "cam1",
            "timestamp": "2025-03-14T12:15:00Z",
            "image_path": 42
        }))
        .unwrap();

    let (status, json) = app
        .get("/api/GetImagesByCamNumber?cameraID=cam1&timestamp=2025-03-14T12:00:00Z")
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_images_by_name_reports_missing_name_first() {
    let app = TestApp::new();

    let (status, json) = app.get("/api/GetImagesByName?timestamp=bad").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Missing required parameter: name");
}

#[tokio::test]
async fn test_embeddings_for_trainer() {
    let app = TestApp::new();
    app.submit(detection("frank", "cam7", "2025-03-14T12:00:00Z", "f.jpg"))
        .await;

    let (status, json) = app
        .get("/api/FetchEmbeddingDetailsForModelTrainer?name=frank")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "OK");
    let item = &json["embeddings"][0];
    assert_eq!(item["Name"], "frank");
    assert_eq!(item["CameraID"], "cam7");
    assert_eq!(item["ImagePath"], "f.jpg");
    assert_eq!(item["Confidence"], 0.9);
    assert!(item["Timestamp"].is_string());
    assert_eq!(
        item["Embedding"].as_array().unwrap().len(),
        EMBEDDING_DIMENSION
    );
}

#[tokio::test]
async fn test_embeddings_errors() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/FetchEmbeddingDetailsForModelTrainer").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .get("/api/FetchEmbeddingDetailsForModelTrainer?name=nobody")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // One undecodable document fails the whole export
    app.submit(detection("gina", "cam1", "2025-03-14T12:00:00Z", "g.jpg"))
        .await;
    app.store
        .insert_raw(json!({ "name": "gina", "embedding": "garbage" }))
        .unwrap();
    let (status, json) = app
        .get("/api/FetchEmbeddingDetailsForModelTrainer?name=gina")
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
}

// =============================================================================
// Upload Tests
// =============================================================================

#[tokio::test]
async fn test_upload_images() {
    let app = TestApp::new();

    let (status, json) = app
        .send(multipart_request(&[
            ("camera_id", None, "cam1"),
            ("images", Some("first.jpg"), "one"),
            ("images", Some("second.png"), "two"),
        ]))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "OK");
    let paths: Vec<&str> = json["paths"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_str().unwrap())
        .collect();
    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with(".jpg"));
    assert!(paths[1].ends_with(".png"));
    assert_eq!(std::fs::read(paths[0]).unwrap(), b"one");
    assert_eq!(std::fs::read(paths[1]).unwrap(), b"two");
}

#[tokio::test]
async fn test_upload_without_images_touches_nothing() {
    let app = TestApp::new();

    let (status, _) = app
        .send(multipart_request(&[("camera_id", None, "cam1")]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!app.snapshots.exists());
}

#[tokio::test]
async fn test_upload_rejects_path_like_camera_id() {
    let app = TestApp::new();

    let (status, _) = app
        .send(multipart_request(&[
            ("camera_id", None, "../escape"),
            ("images", Some("x.jpg"), "x"),
        ]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!app.snapshots.exists());
}

// =============================================================================
// Timeout Tests
// =============================================================================

/// Store whose queries never complete
struct StalledStore;

#[async_trait]
impl DetectionStore for StalledStore {
    async fn insert(&self, _record: &DetectionRecord) -> Result<(), FaceLogError> {
        std::future::pending().await
    }

    async fn find(&self, _filter: &DetectionFilter) -> Result<DocumentCursor, FaceLogError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), FaceLogError> {
        Err(FaceLogError::Store("unreachable".to_string()))
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

fn stalled_app(tmp: &TempDir) -> Router {
    let service = FaceLogService::new(
        Arc::new(StalledStore),
        Arc::new(LocalImageStore::new(tmp.path())),
    )
    .with_operation_timeout(Duration::from_millis(50));
    create_router(Arc::new(AppState::new(
        AppConfig::default(),
        Arc::new(service),
    )))
}

#[tokio::test]
async fn test_stalled_store_times_out() {
    let tmp = tempfile::tempdir().unwrap();
    let app = stalled_app(&tmp);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/GetImagesByName?name=alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_readiness_reports_unreachable_store() {
    let tmp = tempfile::tempdir().unwrap();
    let app = stalled_app(&tmp);

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
