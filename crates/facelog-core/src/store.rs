//! Backend contracts for the document store and snapshot storage
//!
//! Implementations live in `facelog-store`. The adapters in
//! [`crate::repository`] only see these traits, so any backend (or a test
//! double) can be injected through constructors.

use crate::model::{DetectionRecord, TimeFilter, TimeWindow, UploadedImage};
use crate::{FaceLogError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;

/// Stream of raw stored documents produced by a find
///
/// Dropping the cursor releases whatever the backend holds for it.
pub type DocumentCursor = BoxStream<'static, Result<Value>>;

/// Exact-match fields plus an optional `[start, end)` timestamp range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionFilter {
    pub name: Option<String>,
    pub camera_id: Option<String>,
    pub window: Option<TimeWindow>,
}

impl DetectionFilter {
    /// Records from one camera inside a window
    pub fn by_camera(camera_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            name: None,
            camera_id: Some(camera_id.into()),
            window: Some(window),
        }
    }

    /// Records for one subject, optionally restricted in time
    pub fn by_name(name: impl Into<String>, time: TimeFilter) -> Self {
        Self {
            name: Some(name.into()),
            camera_id: None,
            window: time.window(),
        }
    }

    /// Evaluate the filter against a raw stored document
    ///
    /// A document missing a filtered field, or whose timestamp does not parse,
    /// does not match.
    pub fn matches(&self, doc: &Value) -> bool {
        if let Some(name) = &self.name {
            if doc.get("name").and_then(Value::as_str) != Some(name.as_str()) {
                return false;
            }
        }
        if let Some(camera_id) = &self.camera_id {
            if doc.get("camera_id").and_then(Value::as_str) != Some(camera_id.as_str()) {
                return false;
            }
        }
        if let Some(window) = &self.window {
            let ts = doc
                .get("timestamp")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|ts| ts.with_timezone(&Utc));
            match ts {
                Some(ts) if window.contains(ts) => {}
                _ => return false,
            }
        }
        true
    }
}

/// What to do when one document in a result set fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Log and drop the document, keep iterating
    SkipMalformed,
    /// Fail the whole operation with [`FaceLogError::Decode`]
    AbortOnMalformed,
}

impl DecodePolicy {
    /// Drain a cursor, decoding each document as `T`
    ///
    /// Errors raised by the cursor itself always abort, whatever the policy.
    pub async fn decode_all<T: DeserializeOwned>(self, mut cursor: DocumentCursor) -> Result<Vec<T>> {
        let mut decoded = Vec::new();

        while let Some(doc) = cursor.next().await {
            match serde_json::from_value::<T>(doc?) {
                Ok(item) => decoded.push(item),
                Err(e) => match self {
                    Self::SkipMalformed => {
                        tracing::warn!(error = %e, "Skipping malformed detection document");
                    }
                    Self::AbortOnMalformed => {
                        return Err(FaceLogError::Decode(e.to_string()));
                    }
                },
            }
        }

        Ok(decoded)
    }
}

/// Trait for the detection document store
#[async_trait]
pub trait DetectionStore: Send + Sync {
    /// Insert one validated record as a new document
    async fn insert(&self, record: &DetectionRecord) -> Result<()>;

    /// Find documents matching the filter, in store-native order
    async fn find(&self, filter: &DetectionFilter) -> Result<DocumentCursor>;

    /// Round trip used by readiness checks
    async fn ping(&self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Trait for snapshot image storage
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist each image and return its path, in input order
    ///
    /// Files written before a failure are left in place.
    async fn save_all(&self, camera_id: &str, images: &[UploadedImage]) -> Result<Vec<PathBuf>>;
}
