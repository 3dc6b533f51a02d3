//! FaceLog CLI - Command-line interface
//!
//! Usage:
//!   facelog submit <file.json>
//!   facelog by-camera --camera-id <id> --timestamp <rfc3339>
//!   facelog by-name --name <name> [--timestamp <rfc3339|All>]
//!   facelog export-embeddings --name <name> [--output <file>]
//!   facelog init-schema
//!
//! Author: facelog maintainers

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use facelog_core::{
    AppConfig, DetectionRecord, DetectionService, DetectionSubmission, FaceLogService,
    StoreBackend, TimeFilter,
};
use facelog_store::{LocalImageStore, SurrealDetectionStore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "facelog")]
#[command(about = "Face-recognition detection log CLI")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables still override it
    #[arg(long, global = true, env = "FACELOG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit detections from a JSON file holding one object or an array
    Submit {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// List image paths from a camera within one hour of a timestamp
    ByCamera {
        #[arg(long)]
        camera_id: String,
        #[arg(long, value_parser = parse_timestamp)]
        timestamp: DateTime<Utc>,
    },
    /// List image paths for a subject
    ByName {
        #[arg(long)]
        name: String,
        /// RFC 3339 time to center a one-hour window on, or `All`
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Export every stored embedding for a subject
    ExportEmbeddings {
        #[arg(long)]
        name: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Define the detection table in SurrealDB
    InitSchema,
}

/// Export item in the shape the training client reads
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TrainerEmbedding<'a> {
    name: &'a str,
    #[serde(rename = "CameraID")]
    camera_id: &'a str,
    timestamp: DateTime<Utc>,
    embedding: &'a [f64],
    image_path: &'a str,
    confidence: f64,
}

impl<'a> From<&'a DetectionRecord> for TrainerEmbedding<'a> {
    fn from(record: &'a DetectionRecord) -> Self {
        Self {
            name: record.name(),
            camera_id: record.camera_id(),
            timestamp: record.timestamp(),
            embedding: record.embedding().as_slice(),
            image_path: record.image_path(),
            confidence: record.confidence(),
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp format: {e}"))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path).and_then(AppConfig::with_env_override),
        None => AppConfig::from_env(),
    };
    config.context("Failed to load configuration")
}

async fn build_service(config: &AppConfig) -> anyhow::Result<FaceLogService> {
    let store = facelog_store::connect(config)
        .await
        .context("Failed to open detection store")?;
    let images = Arc::new(LocalImageStore::new(&config.storage.snapshot_dir));
    Ok(FaceLogService::new(store, images)
        .with_operation_timeout(config.database.operation_timeout()))
}

fn read_submissions(file: &PathBuf) -> anyhow::Result<Vec<DetectionSubmission>> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let submissions = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?,
        single => vec![serde_json::from_value(single)?],
    };
    Ok(submissions)
}

fn print_paths(paths: &[String]) {
    if paths.is_empty() {
        println!("No images found");
    }
    for path in paths {
        println!("{path}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "facelog=info,facelog_core=info,facelog_store=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    tracing::debug!(backend = ?config.database.backend, "Configuration loaded");

    match cli.command {
        Commands::Submit { file } => {
            let submissions = read_submissions(&file)?;
            let service = build_service(&config).await?;
            let total = submissions.len();

            for (i, submission) in submissions.into_iter().enumerate() {
                service
                    .submit_detection(submission)
                    .await
                    .with_context(|| format!("Detection {} of {total} rejected", i + 1))?;
            }
            println!("Submitted {total} detection(s)");
        }
        Commands::ByCamera {
            camera_id,
            timestamp,
        } => {
            let service = build_service(&config).await?;
            let paths = service.images_by_time_window(&camera_id, timestamp).await?;
            print_paths(&paths);
        }
        Commands::ByName { name, timestamp } => {
            let time = match timestamp.as_deref() {
                None | Some("") => TimeFilter::from_parts(None, false),
                Some("All") => TimeFilter::from_parts(None, true),
                Some(raw) => {
                    let base = parse_timestamp(raw).map_err(anyhow::Error::msg)?;
                    TimeFilter::from_parts(Some(base), false)
                }
            };
            let service = build_service(&config).await?;
            let paths = service.images_by_name_and_time(&name, time).await?;
            print_paths(&paths);
        }
        Commands::ExportEmbeddings { name, output } => {
            let service = build_service(&config).await?;
            let records = service.embeddings_for_subject(&name).await?;
            let items: Vec<TrainerEmbedding<'_>> = records.iter().map(Into::into).collect();
            let json = serde_json::to_string_pretty(&items)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Exported {} embedding(s) to {}", items.len(), path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::InitSchema => {
            if config.database.backend != StoreBackend::SurrealDb {
                bail!("init-schema requires STORE_BACKEND=surrealdb");
            }
            let store = SurrealDetectionStore::new(&config.database).await?;
            store.init_schema().await?;
            println!("Table '{}' is ready", config.database.collection);
        }
    }

    Ok(())
}
