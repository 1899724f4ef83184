use axum::{Json, http::StatusCode};
use netlog_core::{AnalysisReport, IngestionError, LogMetadata};
use netlog_llm::{BackendError, ModelHandle};
use serde::Serialize;

/// JSON error response
#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                error: message.into(),
                code: status.as_u16(),
            }),
        )
    }

    pub fn unavailable(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn ingestion(err: IngestionError) -> (StatusCode, Json<Self>) {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }

    pub fn backend(err: BackendError) -> (StatusCode, Json<Self>) {
        Self::new(StatusCode::BAD_GATEWAY, err.to_string())
    }
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub metadata: LogMetadata,
    /// Characters of the log that will actually be sent for analysis.
    pub analyzed_chars: usize,
    pub truncated: bool,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub metadata: LogMetadata,
    pub report: AnalysisReport,
    pub provider: String,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusResponse {
    Ready {
        provider: String,
        model: ModelHandle,
        max_log_chars: usize,
    },
    Halted {
        reason: String,
    },
}

/// First event of a streamed analysis.
#[derive(Serialize)]
pub struct StreamMeta {
    pub id: String,
    pub model: String,
    pub metadata: LogMetadata,
    pub analyzed_chars: usize,
    pub truncated: bool,
}

#[derive(Serialize)]
pub struct StreamFragment {
    pub index: usize,
    pub text: String,
}

#[derive(Serialize)]
pub struct StreamDone {
    pub text: String,
    pub fragments: usize,
    pub time_ms: u128,
}
