//! FaceLog Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development.
//!
//! Author: facelog maintainers

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Document store connection
    pub database: DatabaseConfig,

    /// Snapshot storage
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(process_env)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    ///
    /// Only variables that are set replace values; everything else keeps
    /// what the file said.
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env(process_env)?;
        self.validate()?;
        Ok(self)
    }

    /// Overwrite every field whose variable `lookup` returns
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse(&lookup, "API_PORT")? {
            self.server.port = port;
        }
        if let Some(size) = env_parse(&lookup, "MAX_BODY_SIZE")? {
            self.server.max_body_size = size;
        }

        // CORS origins (comma-separated)
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Document store
        if let Some(backend) = lookup("STORE_BACKEND") {
            self.database.backend = backend.parse()?;
        }
        if let Some(url) = lookup("SURREALDB_URL") {
            self.database.surrealdb_url = url;
        }
        if let Some(user) = lookup("SURREALDB_USER") {
            self.database.surrealdb_user = user;
        }
        if let Some(pass) = lookup("SURREALDB_PASS") {
            self.database.surrealdb_pass = pass;
        }
        if let Some(ns) = lookup("SURREALDB_NAMESPACE") {
            self.database.surrealdb_namespace = ns;
        }
        if let Some(db) = lookup("SURREALDB_DATABASE") {
            self.database.surrealdb_database = db;
        }
        if let Some(collection) = lookup("FACELOG_COLLECTION") {
            self.database.collection = collection;
        }
        if let Some(secs) = env_parse(&lookup, "STORE_CONNECT_TIMEOUT_SECS")? {
            self.database.connect_timeout_secs = secs;
        }
        if let Some(secs) = env_parse(&lookup, "STORE_OPERATION_TIMEOUT_SECS")? {
            self.database.operation_timeout_secs = secs;
        }

        // Snapshots
        if let Some(dir) = lookup("SNAPSHOT_DIR") {
            self.storage.snapshot_dir = PathBuf::from(dir);
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = env_parse(&lookup, "LOG_JSON")? {
            self.logging.json_format = json;
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.collection.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database.collection".to_string()));
        }
        if self.database.operation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "database.operation_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes (multipart uploads included)
    pub max_body_size: usize,

    /// Allowed origins for CORS; `*` allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8889,
            max_body_size: 32 * 1024 * 1024, // 32MB
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which document store implementation to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    SurrealDb,
    /// In-process store; contents are lost on restart
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "surrealdb" | "surreal" => Ok(Self::SurrealDb),
            "memory" | "mem" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "STORE_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Document store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Store implementation
    pub backend: StoreBackend,

    /// SurrealDB WebSocket URL
    pub surrealdb_url: String,

    /// SurrealDB username
    pub surrealdb_user: String,

    /// SurrealDB password
    pub surrealdb_pass: String,

    /// SurrealDB namespace
    pub surrealdb_namespace: String,

    /// SurrealDB database name
    pub surrealdb_database: String,

    /// Table holding detection documents
    pub collection: String,

    /// Bound on connection establishment
    pub connect_timeout_secs: u64,

    /// Bound on every insert/find round trip
    pub operation_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::SurrealDb,
            surrealdb_url: "ws://localhost:8000".to_string(),
            surrealdb_user: "root".to_string(),
            surrealdb_pass: "root".to_string(),
            surrealdb_namespace: "facelog".to_string(),
            surrealdb_database: "ml_database".to_string(),
            collection: "face_logs".to_string(),
            connect_timeout_secs: 10,
            operation_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory uploaded images are written to
    pub snapshot_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
