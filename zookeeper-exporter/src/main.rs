//! Prometheus exporter for ZooKeeper.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use zookeeper_exporter::{
    Catalog, ExporterConfig, HttpServer, LoggingConfig, MetricsRegistry, Scraper,
};

/// Prometheus exporter for ZooKeeper.
#[derive(Parser, Debug)]
#[command(name = "zookeeper-exporter")]
#[command(about = "Export ZooKeeper mntr statistics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 or JSON format).
    #[arg(short, long)]
    config: PathBuf,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ExporterConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if let Some(listen) = args.listen {
        config.listen_address = listen;
    }

    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    zookeeper_exporter::init_tracing(&log_config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting zookeeper-exporter");
    debug!(config = %serde_json::to_string(&config)?, "Loaded configuration");

    let listen_addr: SocketAddr = config
        .listen_address
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen_address))?;

    if config.zookeeper_configs.is_empty() {
        warn!("No zookeeper_configs configured, only build info will be exported");
    }
    let mut seen = HashSet::new();
    for zk in &config.zookeeper_configs {
        if !seen.insert(zk.name.as_str()) {
            warn!(
                instance = %zk.name,
                "Duplicate instance name, its series will collapse into one"
            );
        }
        info!(
            instance = %zk.name,
            address = %zk.address,
            command = %zk.command(),
            "Monitoring ZooKeeper instance"
        );
    }

    let catalog = Arc::new(Catalog::default());
    let registry = Arc::new(MetricsRegistry::new(&catalog, &config.labels));
    let scraper = Arc::new(Scraper::new(
        config.zookeeper_configs.clone(),
        catalog,
        config.scrape.timeout(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(
        scraper,
        registry,
        listen_addr,
        config.metrics_path.clone(),
    );
    let mut http_task = tokio::spawn(http_server.run(shutdown_rx));

    tokio::select! {
        res = &mut http_task => {
            res.context("HTTP server task failed")?
                .inspect_err(|e| error!("HTTP server error: {}", e))?;
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate_signal() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    let _ = shutdown_tx.send(true);

    if tokio::time::timeout(Duration::from_secs(5), http_task)
        .await
        .is_err()
    {
        warn!("HTTP server did not stop within 5s");
    }

    info!("Exporter stopped");
    Ok(())
}

/// Resolve on SIGTERM (never on non-unix platforms).
async fn terminate_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}
