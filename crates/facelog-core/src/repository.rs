//! Record and embedding adapters over a [`DetectionStore`]
//!
//! These translate the domain lookups into store filters and own the
//! per-query decode policy:
//! - camera/time-window paths abort on a malformed document
//! - name paths skip malformed documents
//! - embedding export aborts on a malformed document

use crate::model::{DetectionRecord, TimeFilter, TimeWindow};
use crate::store::{DecodePolicy, DetectionFilter, DetectionStore};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Projection used by the path-only queries
#[derive(Debug, Deserialize)]
struct ImagePathDocument {
    image_path: String,
}

/// Inserts detection records and answers image-path lookups
#[derive(Clone)]
pub struct RecordRepository {
    store: Arc<dyn DetectionStore>,
}

impl RecordRepository {
    pub fn new(store: Arc<dyn DetectionStore>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, record: &DetectionRecord) -> Result<()> {
        if let Err(e) = self.store.insert(record).await {
            tracing::error!(backend = self.store.name(), error = %e, "Insert failed");
            return Err(e);
        }

        tracing::info!(
            backend = self.store.name(),
            name = record.name(),
            camera_id = record.camera_id(),
            "Face detection stored"
        );
        Ok(())
    }

    /// Image paths from `camera_id` within ±1 hour of `base_time`
    pub async fn image_paths_by_camera(
        &self,
        camera_id: &str,
        base_time: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let filter = DetectionFilter::by_camera(camera_id, TimeWindow::around(base_time));
        self.image_paths(&filter, DecodePolicy::AbortOnMalformed).await
    }

    /// Image paths for `name`, optionally within ±1 hour of a base time
    pub async fn image_paths_by_name(&self, name: &str, time: TimeFilter) -> Result<Vec<String>> {
        let filter = DetectionFilter::by_name(name, time);
        self.image_paths(&filter, DecodePolicy::SkipMalformed).await
    }

    async fn image_paths(
        &self,
        filter: &DetectionFilter,
        policy: DecodePolicy,
    ) -> Result<Vec<String>> {
        let cursor = self.store.find(filter).await?;
        let docs: Vec<ImagePathDocument> = policy.decode_all(cursor).await?;
        Ok(docs.into_iter().map(|d| d.image_path).collect())
    }
}

/// Exports full detection records, embeddings included, for model training
#[derive(Clone)]
pub struct EmbeddingRepository {
    store: Arc<dyn DetectionStore>,
}

impl EmbeddingRepository {
    pub fn new(store: Arc<dyn DetectionStore>) -> Self {
        Self { store }
    }

    /// Every record for `name`; one undecodable document fails the export
    pub async fn fetch_by_name(&self, name: &str) -> Result<Vec<DetectionRecord>> {
        let filter = DetectionFilter::by_name(name, TimeFilter::Unbounded);
        let cursor = self.store.find(&filter).await?;
        DecodePolicy::AbortOnMalformed.decode_all(cursor).await
    }
}
