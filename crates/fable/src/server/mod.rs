//! Web server wiring the caption pipeline to HTTP.
//!
//! Three routes: the upload page at `/`, the caption API at
//! `POST /api/caption`, and a health probe at `/healthz`.

mod error;
mod routes;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use fable_core::{CaptionPipeline, Config};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every request handler.
pub struct AppState {
    pub pipeline: CaptionPipeline,
    pub max_upload_mb: u64,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pipeline: CaptionPipeline::from_config(config),
            max_upload_mb: config.limits.max_upload_mb,
        }
    }
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    // Headroom over the configured limit for multipart framing; the decoder
    // enforces the exact byte limit.
    let body_limit = (state.max_upload_mb as usize + 1) * 1024 * 1024;

    Router::new()
        .route("/", get(routes::index))
        .route("/healthz", get(routes::healthz))
        .route("/api/caption", post(routes::caption))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process is stopped.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(&config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")
}
