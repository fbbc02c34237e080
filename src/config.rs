//! Configuration
//!
//! Loaded from a YAML file; every field has a default so a partial file (or none)
//! is fine:
//!
//! ```yaml
//! store:
//!   uri: http://localhost:7474
//!   database: neo4j
//!   user: neo4j
//! ingest:
//!   concurrency: 10
//!   label: Person
//! paths:
//!   depth_cap: 6
//!   exclusion_policy: log-only
//! data:
//!   attributes_dir: scholar/attributes
//!   links_file: scholar/links.txt
//! ```

use serde::{Deserialize, Serialize};
use smallworld_sdk::{RemoteConfig, RetryPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::algo::{ExclusionPolicy, PathConfig, StatsConfig, DEFAULT_DEPTH_CAP, DEFAULT_EXCLUSION_THRESHOLD};
use crate::ingest::writer::DEFAULT_CONCURRENCY;
use crate::ingest::WriterConfig;
use crate::query::is_safe_identifier;
use crate::report::DEFAULT_THRESHOLD;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Graph store connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub uri: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub request_timeout_ms: u64,
    pub max_retry_time_ms: u64,
    pub initial_retry_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            request_timeout_ms: 30_000,
            max_retry_time_ms: 30_000,
            initial_retry_delay_ms: 1_000,
        }
    }
}

impl StoreConfig {
    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            uri: self.uri.clone(),
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            retry: RetryPolicy {
                max_retry_time: Duration::from_millis(self.max_retry_time_ms),
                initial_delay: Duration::from_millis(self.initial_retry_delay_ms),
                ..RetryPolicy::default()
            },
        }
    }
}

/// Bulk ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub concurrency: usize,
    pub label: String,
    pub relationship_type: String,
    pub entity_log: PathBuf,
    pub link_log: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            label: "Person".to_string(),
            relationship_type: "KNOWS".to_string(),
            entity_log: PathBuf::from("log/create_person.txt"),
            link_log: PathBuf::from("log/create_link.txt"),
        }
    }
}

/// Path search and statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub depth_cap: u32,
    pub exclusion_threshold: u32,
    pub exclusion_policy: ExclusionPolicy,
    /// Average at or below which the small-world hypothesis holds
    pub threshold: f64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            depth_cap: DEFAULT_DEPTH_CAP,
            exclusion_threshold: DEFAULT_EXCLUSION_THRESHOLD,
            exclusion_policy: ExclusionPolicy::LogOnly,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Dataset locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub attributes_dir: PathBuf,
    pub links_file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            attributes_dir: PathBuf::from("scholar/attributes"),
            links_file: PathBuf::from("scholar/links.txt"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub paths: PathsConfig,
    pub data: DataConfig,
}

impl Config {
    /// Read and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.ingest.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "ingest.concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.paths.depth_cap == 0 {
            return Err(ConfigError::Invalid {
                field: "paths.depth_cap",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.paths.exclusion_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "paths.exclusion_threshold",
                reason: "must be at least 1".to_string(),
            });
        }
        if !is_safe_identifier(&self.ingest.label) {
            return Err(ConfigError::Invalid {
                field: "ingest.label",
                reason: format!("{:?} is not a plain identifier", self.ingest.label),
            });
        }
        if !is_safe_identifier(&self.ingest.relationship_type) {
            return Err(ConfigError::Invalid {
                field: "ingest.relationship_type",
                reason: format!("{:?} is not a plain identifier", self.ingest.relationship_type),
            });
        }
        Ok(())
    }

    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            concurrency: self.ingest.concurrency,
            link_label: self.ingest.label.clone(),
            relationship_type: self.ingest.relationship_type.clone(),
        }
    }

    pub fn path_config(&self) -> PathConfig {
        PathConfig {
            label: self.ingest.label.clone(),
            relationship_type: self.ingest.relationship_type.clone(),
            depth_cap: self.paths.depth_cap,
        }
    }

    pub fn stats_config(&self) -> StatsConfig {
        StatsConfig {
            exclusion_threshold: self.paths.exclusion_threshold,
            policy: self.paths.exclusion_policy,
        }
    }
}
