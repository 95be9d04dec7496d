//! HTTP surface of the downloader.
//!
//! Every handler is stateless apart from the shared `AppState`, which only
//! holds immutable configuration, the extractor and an HTTP client.

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;
pub mod thumbnail;

use crate::config::{Config, ServerConfig};
use crate::download::Downloader;
use crate::extractors::MediaExtractor;

#[derive(Clone)]
pub struct AppState {
    pub downloader: Downloader,
    pub http_client: reqwest::Client,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(extractor: Arc<dyn MediaExtractor>, config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.download_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            downloader: Downloader::new(extractor, config),
            http_client,
            started_at: Utc::now(),
        })
    }
}

/// Build the application router
pub fn router(state: AppState, config: &ServerConfig) -> Result<Router> {
    let mut app = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/search", post(handlers::search))
        .route("/api/get-download-url", post(handlers::get_download_url))
        // older front-ends still post here
        .route("/api/download", post(handlers::get_download_url))
        .route("/api/download-file", post(handlers::download_file))
        .route("/api/thumbnail/{*url}", get(handlers::thumbnail))
        .with_state(state);

    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving front-end from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    Ok(app
        .layer(build_cors_layer(&config.allowed_origins)?)
        .layer(TraceLayer::new_for_http()))
}

fn build_cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = if origins.is_empty() || origins.iter().any(|origin| origin.trim() == "*") {
        AllowOrigin::from(Any)
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim())
                    .with_context(|| format!("Invalid allowed origin: {}", origin))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any))
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: &Config, extractor: Arc<dyn MediaExtractor>) -> Result<()> {
    let state = AppState::new(extractor, config)?;
    let app = router(state, &config.server)?;

    let address = config.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
