use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;
use tracing::info;

use super::read_upload;
use crate::models::{ApiError, PreviewResponse};
use crate::state::AppState;

/// Handler: POST /api/preview
pub async fn preview_log(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PreviewResponse>, (StatusCode, Json<ApiError>)> {
    let log = read_upload(&headers, body)?;
    let ingest = &state.settings.ingest;

    let metadata = log.metadata(ingest.preview_chars, ingest.size_warning_bytes);
    let sample = log.sample(ingest.max_log_chars);

    info!(
        file = %metadata.file_name,
        size_bytes = metadata.size_bytes,
        lines = metadata.line_count,
        encoding = log.encoding.label(),
        "Preview request"
    );

    Ok(Json(PreviewResponse {
        metadata,
        analyzed_chars: sample.char_count(),
        truncated: sample.truncated,
    }))
}
