//! Configuration for the ZooKeeper exporter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Command sent to an instance when none is configured.
pub const DEFAULT_MONITOR_COMMAND: &str = "mntr";

/// Paths served by the exporter itself, unavailable as the metrics path.
const RESERVED_PATHS: &[&str] = &["/health"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Address the HTTP endpoint listens on (default: "0.0.0.0:9141").
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Path for the metrics endpoint (default: "/metrics").
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Static labels added to every exported series.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// ZooKeeper servers to scrape, in order.
    #[serde(default)]
    pub zookeeper_configs: Vec<InstanceConfig>,

    /// Scrape settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_listen_address() -> String {
    "0.0.0.0:9141".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// A single monitored ZooKeeper server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Display name, exported as the `host` label.
    pub name: String,

    /// TCP endpoint of the admin port (`host:port`).
    pub address: String,

    /// Four-letter-word command override (default: "mntr").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_command: Option<String>,
}

impl InstanceConfig {
    /// Create an instance using the default monitor command.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            monitor_command: None,
        }
    }

    /// Override the monitor command.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.monitor_command = Some(command.into());
        self
    }

    /// The command to send on each scrape.
    pub fn command(&self) -> &str {
        self.monitor_command
            .as_deref()
            .unwrap_or(DEFAULT_MONITOR_COMMAND)
    }
}

/// Per-connection scrape settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Deadline covering connect, write and the full read (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    5
}

impl ScrapeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 (or plain JSON) file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .listen_address
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.listen_address
            )));
        }

        if !self.metrics_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if RESERVED_PATHS.contains(&self.metrics_path.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} is reserved",
                self.metrics_path
            )));
        }

        // Route captures and wildcards would shadow real paths.
        if self
            .metrics_path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
        {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} must not contain : or * segments",
                self.metrics_path
            )));
        }

        if self.scrape.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        for (i, zk) in self.zookeeper_configs.iter().enumerate() {
            if zk.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "zookeeper_configs[{}]: name must not be empty",
                    i
                )));
            }
            if zk.address.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "zookeeper_configs[{}] ({}): address must not be empty",
                    i, zk.name
                )));
            }
            if zk
                .monitor_command
                .as_deref()
                .is_some_and(|c| c.trim().is_empty())
            {
                return Err(ConfigError::Validation(format!(
                    "zookeeper_configs[{}] ({}): monitor_command must not be empty",
                    i, zk.name
                )));
            }
        }

        Ok(())
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
            labels: BTreeMap::new(),
            zookeeper_configs: Vec::new(),
            scrape: ScrapeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
