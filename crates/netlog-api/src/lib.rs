//! HTTP surface for the network log analyzer: the single page plus its JSON/SSE API.

pub mod handlers;
pub mod models;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Html,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use handlers::{analyze_log, analyze_log_stream, download_report, get_status, health, preview_log};
use state::AppState;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.settings.ingest.max_upload_bytes;

    Router::new()
        .route("/", get(|| async { Html(INDEX_HTML) }))
        .route("/health", get(health))
        .route("/api/status", get(get_status))
        .route("/api/preview", post(preview_log))
        .route("/api/analyze", post(analyze_log))
        .route("/api/analyze/stream", post(analyze_log_stream))
        .route("/api/report", post(download_report))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
