//! Configuration loading and typed config structures for the Antrian service.
//!
//! The optional configuration file is `antrian-config.yaml` in the working
//! directory. This module defines strongly-typed structs that mirror the
//! YAML structure and provides a loader that reads it. Every field has a
//! default, so an empty or missing file yields a runnable configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid environment override {name}: {message}")]
    Env {
        /// The environment variable name.
        name: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `antrian-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Snapshot file location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cross-origin policy for the browser front-ends.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Display fan-out tuning.
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

impl ServiceConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `ANTRIAN_HOST` overrides `server.host`
    /// - `ANTRIAN_PORT` overrides `server.port`
    /// - `ANTRIAN_DATA_FILE` overrides `storage.data_file`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Env`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml maps an empty document to unit, not to a map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override selected values with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `ANTRIAN_PORT` is not a valid port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("ANTRIAN_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("ANTRIAN_PORT") {
            self.server.port = val.parse().map_err(|e| ConfigError::Env {
                name: "ANTRIAN_PORT",
                message: format!("{e}"),
            })?;
        }
        if let Ok(val) = std::env::var("ANTRIAN_DATA_FILE") {
            self.storage.data_file = PathBuf::from(val);
        }
        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Snapshot persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot of every patient record, rewritten after each mutation.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API. Empty or `*` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// Whether every origin is accepted.
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Display fan-out configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Outbound messages buffered per display connection.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_data_file() -> PathBuf {
    PathBuf::from("patients.json")
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_owned()]
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_subscriber_buffer() -> usize {
    64
}
