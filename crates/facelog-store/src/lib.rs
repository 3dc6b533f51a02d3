//! FaceLog Store - Storage backends
//!
//! Implementations of the `facelog-core` storage traits:
//! - [`SurrealDetectionStore`]: detection documents in SurrealDB
//! - [`MemoryDetectionStore`]: in-process documents for development and tests
//! - [`LocalImageStore`]: uploaded snapshots on local disk

pub mod memory;
pub mod snapshot;
pub mod surrealdb_store;

pub use memory::MemoryDetectionStore;
pub use snapshot::LocalImageStore;
pub use surrealdb_store::SurrealDetectionStore;

use facelog_core::{AppConfig, DetectionStore, StoreBackend};
use std::sync::Arc;

/// Open the document store selected by the configuration
pub async fn connect(config: &AppConfig) -> facelog_core::Result<Arc<dyn DetectionStore>> {
    match config.database.backend {
        StoreBackend::SurrealDb => {
            let store = SurrealDetectionStore::new(&config.database).await?;
            store.init_schema().await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory detection store; data is lost on restart");
            Ok(Arc::new(MemoryDetectionStore::new()))
        }
    }
}
