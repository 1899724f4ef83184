use axum::{Json, extract::State};
use std::sync::Arc;

use crate::models::StatusResponse;
use crate::state::{AppState, Readiness};

/// Handler: GET /api/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(match &state.readiness {
        Readiness::Ready(analyzer) => StatusResponse::Ready {
            provider: analyzer.provider().to_string(),
            model: analyzer.model().clone(),
            max_log_chars: analyzer.config().max_log_chars,
        },
        Readiness::Halted(reason) => StatusResponse::Halted {
            reason: reason.clone(),
        },
    })
}

pub async fn health() -> &'static str {
    "ok"
}
