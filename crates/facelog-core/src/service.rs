//! Validation and orchestration layer
//!
//! Validates submissions before any store access, bounds every store round
//! trip with a timeout and routes lookups to the record/embedding adapters.

use crate::model::{DetectionRecord, DetectionSubmission, TimeFilter, UploadedImage};
use crate::repository::{EmbeddingRepository, RecordRepository};
use crate::store::{DetectionStore, ImageStore};
use crate::{FaceLogError, Result, ValidationError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single store round trip
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations exposed to the HTTP and CLI front ends
#[async_trait]
pub trait DetectionService: Send + Sync {
    /// Validate and persist one detection event
    async fn submit_detection(&self, submission: DetectionSubmission) -> Result<()>;

    /// Save uploaded snapshots and return their paths in input order
    async fn upload_images(
        &self,
        camera_id: &str,
        images: Vec<UploadedImage>,
    ) -> Result<Vec<PathBuf>>;

    /// Image paths from one camera within ±1 hour of `base_time`
    async fn images_by_time_window(
        &self,
        camera_id: &str,
        base_time: DateTime<Utc>,
    ) -> Result<Vec<String>>;

    /// Image paths for one subject, optionally restricted in time
    async fn images_by_name_and_time(&self, name: &str, time: TimeFilter) -> Result<Vec<String>>;

    /// Full records (with embeddings) for one subject
    async fn embeddings_for_subject(&self, name: &str) -> Result<Vec<DetectionRecord>>;

    /// Check that the document store answers
    async fn ping(&self) -> Result<()>;
}

/// Default [`DetectionService`] backed by injected store handles
pub struct FaceLogService {
    store: Arc<dyn DetectionStore>,
    records: RecordRepository,
    embeddings: EmbeddingRepository,
    images: Arc<dyn ImageStore>,
    operation_timeout: Duration,
}

impl FaceLogService {
    pub fn new(store: Arc<dyn DetectionStore>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            records: RecordRepository::new(store.clone()),
            embeddings: EmbeddingRepository::new(store.clone()),
            store,
            images,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(operation, "Store operation timed out");
                Err(FaceLogError::Timeout {
                    operation,
                    secs: self.operation_timeout.as_secs(),
                })
            }
        }
    }
}

/// Camera IDs end up inside file names
fn check_camera_id(camera_id: &str) -> std::result::Result<(), ValidationError> {
    if camera_id.is_empty()
        || camera_id.contains(['/', '\\', '\0'])
        || camera_id.contains("..")
    {
        return Err(ValidationError::InvalidCameraId(camera_id.to_string()));
    }
    Ok(())
}

#[async_trait]
impl DetectionService for FaceLogService {
    async fn submit_detection(&self, submission: DetectionSubmission) -> Result<()> {
        let record = submission.validate()?;
        self.bounded("insert", self.records.insert(&record)).await
    }

    async fn upload_images(
        &self,
        camera_id: &str,
        images: Vec<UploadedImage>,
    ) -> Result<Vec<PathBuf>> {
        if images.is_empty() {
            return Err(ValidationError::NoImages.into());
        }
        check_camera_id(camera_id)?;

        let paths = self.images.save_all(camera_id, &images).await?;
        tracing::info!(camera_id, count = paths.len(), "Snapshots saved");
        Ok(paths)
    }

    async fn images_by_time_window(
        &self,
        camera_id: &str,
        base_time: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        self.bounded(
            "find by camera",
            self.records.image_paths_by_camera(camera_id, base_time),
        )
        .await
    }

    async fn images_by_name_and_time(&self, name: &str, time: TimeFilter) -> Result<Vec<String>> {
        self.bounded("find by name", self.records.image_paths_by_name(name, time))
            .await
    }

    async fn embeddings_for_subject(&self, name: &str) -> Result<Vec<DetectionRecord>> {
        self.bounded("fetch embeddings", self.embeddings.fetch_by_name(name))
            .await
    }

    async fn ping(&self) -> Result<()> {
        self.bounded("ping", self.store.ping()).await
    }
}
