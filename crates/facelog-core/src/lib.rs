//! FaceLog Core - Domain models, validation and query orchestration
//!
//! This crate defines the core abstractions used throughout FaceLog:
//! - Detection records and the 128-dimensional embedding type
//! - Time windows used by the "temporal neighborhood" lookups
//! - Common error types
//! - Backend traits for the document store and snapshot storage
//! - The record/embedding adapters and the orchestration service
//! - Configuration management

pub mod config;
pub mod model;
pub mod repository;
pub mod service;
pub mod store;

pub use config::{
    AppConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig, StorageConfig,
    StoreBackend,
};
pub use model::{
    DetectionRecord, DetectionSubmission, Embedding, TimeFilter, TimeWindow, UploadedImage,
    EMBEDDING_DIMENSION,
};
pub use repository::{EmbeddingRepository, RecordRepository};
pub use service::{DetectionService, FaceLogService};
pub use store::{DecodePolicy, DetectionFilter, DetectionStore, DocumentCursor, ImageStore};

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Reasons a detection submission or upload is rejected before any I/O
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("name, camera_id, and image_path must not be empty")]
    EmptyField,

    #[error("embedding must contain exactly {expected} float values, got {actual}")]
    EmbeddingDimension { expected: usize, actual: usize },

    #[error("timestamp must not be empty")]
    MissingTimestamp,

    #[error("confidence must be between 0 and 1, got {0}")]
    ConfidenceOutOfRange(f64),

    #[error("please insert at least one image")]
    NoImages,

    #[error("invalid camera_id for file storage: {0:?}")]
    InvalidCameraId(String),
}

/// Core error type for FaceLog operations
#[derive(Error, Debug)]
pub enum FaceLogError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FaceLogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ConfigError> for FaceLogError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FaceLogError>;

// ============================================================================
// Tests
// ============================================================================
