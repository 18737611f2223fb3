//! Configuration for the Objectspace document service
//!
//! Settings are read from an optional TOML file; every section falls back to
//! its `Default` impl so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::types::{Error, Result};

/// Default on-disk location of the collection
pub const DEFAULT_DATA_DIR: &str = "object_db";

/// Default collection (bucket) name
pub const DEFAULT_COLLECTION: &str = "docs";

/// Default HTTP route serving the collection
pub const DEFAULT_DOC_ROUTE: &str = "/api/docs";

/// Routes served by the system handlers
const RESERVED_ROUTES: [&str; 2] = ["/health", "/metrics"];

/// Available storage backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Store-assigned integer identifiers with hash-partitioned paging
    Counter,
    /// Client-supplied `uuid` keys with transactional bucket access
    Keyed,
}

impl std::str::FromStr for StorageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "counter" => Ok(StorageType::Counter),
            "keyed" => Ok(StorageType::Keyed),
            other => Err(Error::config(format!(
                "Invalid storage type: {}. Valid options: counter, keyed",
                other
            ))),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: SocketAddr,

    /// Route serving insert and listing requests
    pub doc_route: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend type
    pub storage_type: StorageType,

    /// Directory holding the database file
    pub data_dir: PathBuf,

    /// Name of the single collection
    pub collection: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose Prometheus metrics at `/metrics`
    pub enable_prometheus: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 18888)),
            doc_route: DEFAULT_DOC_ROUTE.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Counter,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enable_prometheus: true,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.server.doc_route.starts_with('/') || self.server.doc_route.len() < 2 {
            return Err(Error::config(format!(
                "Document route must be an absolute path other than '/': '{}'",
                self.server.doc_route
            )));
        }

        if RESERVED_ROUTES.contains(&self.server.doc_route.as_str()) {
            return Err(Error::config(format!(
                "Document route '{}' is reserved",
                self.server.doc_route
            )));
        }

        if self.storage.collection.is_empty() {
            return Err(Error::config("Collection name must not be empty"));
        }

        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(Error::config("Data directory must not be empty"));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(Error::config(format!("Invalid log level: {}", other))),
        }

        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read config file {:?}: {}", path, e)))?;

    toml::from_str(&contents)
        .map_err(|e| Error::config(format!("Failed to parse config file {:?}: {}", path, e)))
}
