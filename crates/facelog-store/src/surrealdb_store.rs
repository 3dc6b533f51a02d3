//! SurrealDB implementation of the detection store
//!
//! Every detection is one document in a single table. Inserts cast the
//! timestamp to a SurrealDB `datetime` so range filters compare instants,
//! and finds project it back to an RFC 3339 string so rows decode as plain
//! JSON.
//!
//! Author: facelog maintainers

use async_trait::async_trait;
use chrono::SecondsFormat;
use facelog_core::{
    DatabaseConfig, DetectionFilter, DetectionRecord, DetectionStore, DocumentCursor,
    FaceLogError, Result,
};
use futures::stream::{self, StreamExt};
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

const INSERT_QUERY: &str = "CREATE type::table($table) SET \
    name = $name, \
    camera_id = $camera_id, \
    timestamp = <datetime> $timestamp, \
    embedding = $embedding, \
    image_path = $image_path, \
    confidence = $confidence";

const SELECT_FIELDS: &str = "SELECT name, camera_id, <string> timestamp AS timestamp, \
    embedding, image_path, confidence FROM type::table($table)";

/// SurrealDB detection store
pub struct SurrealDetectionStore {
    client: Surreal<Client>,
    table: String,
}

impl SurrealDetectionStore {
    /// Create a new SurrealDB connection
    ///
    /// Connection, sign-in and namespace selection share the configured
    /// connect timeout.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if !is_identifier(&config.collection) {
            return Err(FaceLogError::Config(format!(
                "collection must be a plain identifier: {:?}",
                config.collection
            )));
        }

        let timeout = config.connect_timeout();
        let client = tokio::time::timeout(timeout, Self::connect(config))
            .await
            .map_err(|_| FaceLogError::Timeout {
                operation: "connect",
                secs: config.connect_timeout_secs,
            })??;

        tracing::info!(
            url = %config.surrealdb_url,
            namespace = %config.surrealdb_namespace,
            database = %config.surrealdb_database,
            table = %config.collection,
            "SurrealDB connected"
        );

        Ok(Self {
            client,
            table: config.collection.clone(),
        })
    }

    async fn connect(config: &DatabaseConfig) -> Result<Surreal<Client>> {
        // Remove ws:// or wss:// prefix if present (surrealdb crate adds it automatically)
        let url = config
            .surrealdb_url
            .strip_prefix("ws://")
            .or_else(|| config.surrealdb_url.strip_prefix("wss://"))
            .unwrap_or(&config.surrealdb_url);

        let client = Surreal::new::<Ws>(url)
            .await
            .map_err(|e| FaceLogError::Store(format!("SurrealDB connection failed: {e}")))?;

        client
            .signin(Root {
                username: &config.surrealdb_user,
                password: &config.surrealdb_pass,
            })
            .await
            .map_err(|e| FaceLogError::Store(format!("SurrealDB auth failed: {e}")))?;

        client
            .use_ns(&config.surrealdb_namespace)
            .use_db(&config.surrealdb_database)
            .await
            .map_err(|e| FaceLogError::Store(format!("SurrealDB namespace error: {e}")))?;

        Ok(client)
    }

    /// Define the detection table (idempotent)
    pub async fn init_schema(&self) -> Result<()> {
        // DEFINE takes an identifier, not a parameter
        self.client
            .query(format!("DEFINE TABLE IF NOT EXISTS {} SCHEMALESS", self.table))
            .await
            .and_then(|response| response.check())
            .map_err(|e| FaceLogError::Store(format!("Schema init failed: {e}")))?;

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build the SurrealQL for a filter; all values are bound parameters
fn select_query(filter: &DetectionFilter) -> String {
    let mut conditions = Vec::new();
    if filter.name.is_some() {
        conditions.push("name = $name");
    }
    if filter.camera_id.is_some() {
        conditions.push("camera_id = $camera_id");
    }
    if filter.window.is_some() {
        conditions.push("timestamp >= <datetime> $start AND timestamp < <datetime> $end");
    }

    if conditions.is_empty() {
        SELECT_FIELDS.to_string()
    } else {
        format!("{SELECT_FIELDS} WHERE {}", conditions.join(" AND "))
    }
}

fn rfc3339(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[async_trait]
impl DetectionStore for SurrealDetectionStore {
    async fn insert(&self, record: &DetectionRecord) -> Result<()> {
        self.client
            .query(INSERT_QUERY)
            .bind(("table", self.table.clone()))
            .bind(("name", record.name().to_string()))
            .bind(("camera_id", record.camera_id().to_string()))
            .bind(("timestamp", rfc3339(record.timestamp())))
            .bind(("embedding", record.embedding().as_slice().to_vec()))
            .bind(("image_path", record.image_path().to_string()))
            .bind(("confidence", record.confidence()))
            .await
            .and_then(|response| response.check())
            .map_err(|e| FaceLogError::Store(format!("Failed to insert detection: {e}")))?;

        Ok(())
    }

    async fn find(&self, filter: &DetectionFilter) -> Result<DocumentCursor> {
        let sql = select_query(filter);
        tracing::debug!(%sql, "Running detection query");

        let mut query = self.client.query(sql).bind(("table", self.table.clone()));
        if let Some(name) = &filter.name {
            query = query.bind(("name", name.clone()));
        }
        if let Some(camera_id) = &filter.camera_id {
            query = query.bind(("camera_id", camera_id.clone()));
        }
        if let Some(window) = &filter.window {
            query = query
                .bind(("start", rfc3339(window.start)))
                .bind(("end", rfc3339(window.end)));
        }

        let mut response = query
            .await
            .map_err(|e| FaceLogError::Store(format!("Query failed: {e}")))?;
        let rows: Vec<serde_json::Value> = response
            .take(0)
            .map_err(|e| FaceLogError::Store(format!("Result extraction failed: {e}")))?;

        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .health()
            .await
            .map_err(|e| FaceLogError::Store(format!("SurrealDB health check failed: {e}")))
    }

    fn name(&self) -> &str {
        "surrealdb"
    }
}
