//! FaceLog API Server
//!
//! REST API server for face-recognition detection logging.
//!
//! Author: facelog maintainers

use anyhow::Context;
use facelog_api::{create_router, state::AppState};
use facelog_core::{AppConfig, FaceLogService, LoggingConfig};
use facelog_store::LocalImageStore;
use std::sync::Arc;

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "facelog_api={level},facelog_core={level},facelog_store={level},tower_http=debug",
            level = logging.level
        )
        .into()
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    match std::env::var("FACELOG_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)
            .and_then(AppConfig::with_env_override)
            .with_context(|| format!("Failed to load configuration from {path}")),
        Err(_) => AppConfig::from_env().context("Failed to load configuration from environment"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    // Storage backends
    let store = facelog_store::connect(&config)
        .await
        .context("Failed to open detection store")?;
    tracing::info!(backend = store.name(), "Detection store ready");

    let images = Arc::new(LocalImageStore::new(&config.storage.snapshot_dir));
    let service = FaceLogService::new(store, images)
        .with_operation_timeout(config.database.operation_timeout());

    let addr = config.server.bind_addr();
    let state = Arc::new(AppState::new(config, Arc::new(service)));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("FaceLog API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
