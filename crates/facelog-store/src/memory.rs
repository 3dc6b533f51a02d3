//! In-process detection store
//!
//! Keeps raw JSON documents in a vector and evaluates filters with the same
//! semantics as the SurrealDB queries. Useful for local development
//! (`STORE_BACKEND=memory`) and for tests that need to seed malformed
//! documents.

use async_trait::async_trait;
use facelog_core::{
    DetectionFilter, DetectionRecord, DetectionStore, DocumentCursor, FaceLogError, Result,
};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// In-memory implementation of [`DetectionStore`]
///
/// Documents are returned in insertion order.
#[derive(Clone, Default)]
pub struct MemoryDetectionStore {
    docs: Arc<RwLock<Vec<Value>>>,
}

impl MemoryDetectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document as-is, bypassing validation
    pub fn insert_raw(&self, doc: Value) -> Result<()> {
        self.docs
            .write()
            .map_err(|e| FaceLogError::Store(format!("Failed to acquire write lock: {e}")))?
            .push(doc);
        Ok(())
    }

    /// Number of stored documents
    pub fn len(&self) -> Result<usize> {
        let docs = self
            .docs
            .read()
            .map_err(|e| FaceLogError::Store(format!("Failed to acquire read lock: {e}")))?;
        Ok(docs.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }
}

#[async_trait]
impl DetectionStore for MemoryDetectionStore {
    async fn insert(&self, record: &DetectionRecord) -> Result<()> {
        let doc = serde_json::to_value(record)
            .map_err(|e| FaceLogError::Store(format!("Failed to encode detection: {e}")))?;
        self.insert_raw(doc)
    }

    async fn find(&self, filter: &DetectionFilter) -> Result<DocumentCursor> {
        let matching: Vec<Value> = {
            let docs = self
                .docs
                .read()
                .map_err(|e| FaceLogError::Store(format!("Failed to acquire read lock: {e}")))?;
            docs.iter().filter(|doc| filter.matches(doc)).cloned().collect()
        };
        Ok(stream::iter(matching.into_iter().map(Ok)).boxed())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use facelog_core::{DetectionSubmission, TimeFilter, TimeWindow, EMBEDDING_DIMENSION};
    use serde_json::json;

    fn record(name: &str, camera_id: &str, offset_mins: i64) -> DetectionRecord {
        let base = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
        DetectionSubmission {
            name: name.to_string(),
            camera_id: camera_id.to_string(),
            timestamp: Some(base + Duration::minutes(offset_mins)),
            embedding: vec![0.0; EMBEDDING_DIMENSION],
            image_path: format!("{name}-{camera_id}-{offset_mins}.jpg"),
            confidence: 1.0,
        }
        .validate()
        .unwrap()
    }

    async fn collect(store: &MemoryDetectionStore, filter: &DetectionFilter) -> Vec<Value> {
        store
            .find(filter)
            .await
            .unwrap()
            .map(|doc| doc.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_insert_and_find_by_camera_window() {
        let store = MemoryDetectionStore::new();
        store.insert(&record("alice", "cam1", 0)).await.unwrap();
        store.insert(&record("alice", "cam1", 60)).await.unwrap();
        store.insert(&record("bob", "cam1", -60)).await.unwrap();
        store.insert(&record("bob", "cam2", 0)).await.unwrap();
        assert_eq!(store.len().unwrap(), 4);

        let base = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
        let docs = collect(
            &store,
            &DetectionFilter::by_camera("cam1", TimeWindow::around(base)),
        )
        .await;

        let paths: Vec<&str> = docs.iter().filter_map(|d| d["image_path"].as_str()).collect();
        assert_eq!(paths, vec!["alice-cam1-0.jpg", "bob-cam1--60.jpg"]);
    }

    #[tokio::test]
    async fn test_find_by_name_preserves_insertion_order() {
        let store = MemoryDetectionStore::new();
        store.insert(&record("alice", "cam2", 500)).await.unwrap();
        store.insert(&record("alice", "cam1", -500)).await.unwrap();

        let docs = collect(&store, &DetectionFilter::by_name("alice", TimeFilter::Unbounded)).await;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["camera_id"], "cam2");
        assert_eq!(docs[1]["camera_id"], "cam1");
    }

    #[tokio::test]
    async fn test_raw_documents_are_returned_unvalidated() {
        let store = MemoryDetectionStore::new();
        store
            .insert_raw(json!({ "name": "alice", "embedding": "garbage" }))
            .unwrap();

        let docs = collect(&store, &DetectionFilter::by_name("alice", TimeFilter::Unbounded)).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["embedding"], "garbage");
    }

    #[tokio::test]
    async fn test_clones_share_documents() {
        let store = MemoryDetectionStore::new();
        let handle = store.clone();
        handle.insert(&record("carol", "cam3", 0)).await.unwrap();
        assert!(!store.is_empty().unwrap());
    }
}
