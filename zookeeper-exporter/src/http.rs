//! HTTP server for the Prometheus metrics endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::registry::MetricsRegistry;
use crate::scrape::Scraper;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    scraper: Arc<Scraper>,
    registry: Arc<MetricsRegistry>,
    metrics_path: Arc<str>,
}

/// Create the HTTP router.
fn create_router(
    scraper: Arc<Scraper>,
    registry: Arc<MetricsRegistry>,
    metrics_path: &str,
) -> Router {
    let state = AppState {
        scraper,
        registry,
        metrics_path: metrics_path.into(),
    };

    let mut router = Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler));

    if metrics_path != "/" {
        router = router.route("/", get(root_handler));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

/// Handler for the metrics endpoint. Runs one collection cycle per request.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let started = std::time::Instant::now();
    let samples = state.scraper.collect_samples().await;
    let body = state.registry.render(&samples);

    debug!(
        samples = samples.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Collection cycle finished"
    );

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Handler for the landing page.
async fn root_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>ZooKeeper Exporter</title></head>
<body>
<h1>ZooKeeper Exporter</h1>
<p><a href="{}">Metrics</a></p>
</body>
</html>
"#,
        state.metrics_path
    ))
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer {
    scraper: Arc<Scraper>,
    registry: Arc<MetricsRegistry>,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(
        scraper: Arc<Scraper>,
        registry: Arc<MetricsRegistry>,
        listen_addr: SocketAddr,
        metrics_path: String,
    ) -> Self {
        Self {
            scraper,
            registry,
            listen_addr,
            metrics_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal is received.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.scraper, self.registry, &self.metrics_path);
        let addr = listener.local_addr()?;

        info!(
            addr = %addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
