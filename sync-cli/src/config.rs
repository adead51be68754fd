//! Configuration loading for practice-sync.
//!
//! Configuration is read from `practice-sync.toml` in the data directory.
//! A missing file means all defaults.

use practice_sync_client::{EngineConfig, HttpWorkSourceConfig, RetryPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up inside the data directory.
pub const CONFIG_FILE: &str = "practice-sync.toml";

/// Root configuration for practice-sync.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Remote work source.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Engine tuning.
    #[serde(default)]
    pub engine: EngineSection,
    /// Local user.
    #[serde(default)]
    pub user: UserConfig,
}

/// Remote work source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Server root (default: http://localhost:8000).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Cached item lifetime in hours (default: 24).
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    /// Failed submissions allowed before a result is discarded.
    /// Unset keeps results forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Upper bound on items fetched by one fill (default: 50).
    #[serde(default = "default_fill_batch_limit")]
    pub fill_batch_limit: usize,
    /// Background connectivity probe period in seconds (default: 30, 0 disables).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

/// Local user configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    /// Identifier stamped on a freshly initialized progress snapshot.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_fill_batch_limit() -> usize {
    50
}

fn default_probe_interval_secs() -> u64 {
    30
}

fn default_user_id() -> String {
    "local".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            max_attempts: None,
            fill_batch_limit: default_fill_batch_limit(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `practice-sync.toml` from `data_dir`, or defaults if absent.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, data_dir.display());
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Engine settings derived from the `[engine]` section.
    pub fn engine_config(&self) -> EngineConfig {
        let retry = match self.engine.max_attempts {
            Some(max) => RetryPolicy::bounded(max),
            None => RetryPolicy::unbounded(),
        };
        EngineConfig {
            ttl: Duration::from_secs(self.engine.ttl_hours * 60 * 60),
            retry,
            fill_batch_limit: self.engine.fill_batch_limit,
            probe_interval: match self.engine.probe_interval_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    /// HTTP work source settings derived from the `[remote]` section.
    pub fn work_source_config(&self) -> HttpWorkSourceConfig {
        HttpWorkSourceConfig {
            base_url: self.remote.base_url.clone(),
            timeout: self.timeout(),
        }
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}
