//! Prometheus exporter for ZooKeeper.
//!
//! On every scrape of the HTTP metrics endpoint the exporter sends the
//! `mntr` four-letter-word command to each configured ZooKeeper server,
//! parses the tab-separated reply and renders the known keys as Prometheus
//! metrics, together with a `zk_up` indicator per server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   ZooKeeper     │<───>│     Scraper     │────>│   HTTP Server   │
//! │  (mntr / 2181)  │     │ (fan-out, join) │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! - [`client`] - one timed TCP exchange with an instance
//! - [`catalog`] - the fixed set of exported `mntr` keys
//! - [`parser`] - `key<TAB>value` response parsing
//! - [`scrape`] - concurrent collection cycle and sample sinks
//! - [`registry`] - descriptors and text exposition
//! - [`http`] - axum server
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod parser;
pub mod registry;
pub mod scrape;

pub use catalog::{Catalog, MetricSpec, ValueKind};
pub use config::{ConfigError, ExporterConfig, InstanceConfig, LogFormat, LoggingConfig};
pub use error::ScrapeError;
pub use http::HttpServer;
pub use registry::MetricsRegistry;
pub use scrape::{Sample, SampleMetric, SampleSink, ScrapeResult, Scraper, VecSink};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| {
                    ConfigError::Validation(format!("Failed to initialize tracing: {}", e))
                })?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| {
                    ConfigError::Validation(format!("Failed to initialize tracing: {}", e))
                })?;
        }
    }

    Ok(())
}
