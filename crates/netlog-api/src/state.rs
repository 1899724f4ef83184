use axum::{Json, http::StatusCode};
use netlog_core::Settings;
use netlog_llm::Analyzer;

use crate::models::ApiError;

/// Whether startup produced a usable pipeline.
pub enum Readiness {
    Ready(Analyzer),
    /// Configuration failed; the message is shown on the page and analysis is refused.
    Halted(String),
}

pub struct AppState {
    pub settings: Settings,
    pub readiness: Readiness,
}

impl AppState {
    pub fn ready(settings: Settings, analyzer: Analyzer) -> Self {
        Self {
            settings,
            readiness: Readiness::Ready(analyzer),
        }
    }

    pub fn halted(settings: Settings, reason: impl Into<String>) -> Self {
        Self {
            settings,
            readiness: Readiness::Halted(reason.into()),
        }
    }

    pub fn analyzer(&self) -> Result<&Analyzer, (StatusCode, Json<ApiError>)> {
        match &self.readiness {
            Readiness::Ready(analyzer) => Ok(analyzer),
            Readiness::Halted(reason) => Err(ApiError::unavailable(reason.clone())),
        }
    }
}
