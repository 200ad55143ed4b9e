// HTTP command surface
//
// Routes:
// - POST /crawl      start a search, returns {"id": ...}
// - GET  /crawl/:id  poll a search, returns {"id", "status", "urls"}
// - GET  /health     liveness
//
// On Ctrl+C or SIGTERM the listener stops first, then running searches are
// drained within the configured grace period.

use crate::config::Config;
use crate::crawler::{HttpFetcher, PageFetcher};
use crate::service::SearchService;
use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

mod handlers;

use handlers::{get_crawl, health_check, start_crawl};

/// Application state shared across all requests
pub(crate) struct AppState<F> {
    pub service: Arc<SearchService<F>>,
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

/// Error type that implements IntoResponse
pub(crate) struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request error: {:?}", self.error);
        }
        (
            self.status,
            Json(json!({
                "error": self.error.to_string(),
            })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }
}

/// Builds the router for a search service
pub fn router<F: PageFetcher>(service: Arc<SearchService<F>>) -> Router {
    Router::new()
        .route("/crawl", post(start_crawl::<F>))
        .route("/crawl/:id", get(get_crawl::<F>))
        .route("/health", get(health_check))
        .with_state(AppState { service })
}

/// Serves the API on `listener` until `shutdown` resolves, then drains searches
pub async fn serve<F, S>(listener: TcpListener, service: Arc<SearchService<F>>, shutdown: S) -> Result<()>
where
    F: PageFetcher,
    S: Future<Output = ()> + Send + 'static,
{
    let app = router(Arc::clone(&service));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    let cancelled = service.shutdown().await;
    if cancelled > 0 {
        warn!("{} searches were cancelled at shutdown", cancelled);
    }

    Ok(())
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Periodically drops finished searches older than `retention`
fn spawn_eviction<F: PageFetcher>(
    service: Arc<SearchService<F>>,
    retention: Duration,
) -> tokio::task::JoinHandle<()> {
    let period = retention.min(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            service.evict_finished(retention);
        }
    })
}

/// Entry point for server mode
pub async fn run(config: Config) -> Result<()> {
    let fetcher = HttpFetcher::new(&config.user_agent).context("Failed to build HTTP client")?;
    let service = Arc::new(SearchService::from_config(&config, fetcher));

    let eviction = config
        .registry
        .retention()
        .map(|retention| {
            info!("Finished searches are evicted after {:?}", retention);
            spawn_eviction(Arc::clone(&service), retention)
        });

    let addr = &config.server.listen_addr;
    let listener = TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to {}", addr))?;

    info!("Search API listening on http://{}", addr);
    info!("Base URL: {}", config.crawler.base_url);
    info!("Routes:");
    info!("  POST http://{}/crawl     - Start a search", addr);
    info!("  GET  http://{}/crawl/:id - Poll a search", addr);
    info!("  GET  http://{}/health    - Health check", addr);
    info!("Press Ctrl+C or send SIGTERM to stop");

    let result = serve(listener, service, shutdown_signal()).await;

    if let Some(handle) = eviction {
        handle.abort();
    }

    info!("Server shutdown complete");
    result
}
