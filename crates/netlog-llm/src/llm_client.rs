// LLM client abstraction
// Anything that can list models and turn a prompt into text, whole or in fragments.

use async_trait::async_trait;
use futures::stream::BoxStream;
use netlog_core::config::GenerationSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Generation blocked: {0}")]
    Blocked(String),

    #[error("Stream interrupted: {0}")]
    Interrupted(String),
}

/// Sampling parameters, serialized as Gemini's `generationConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 2048,
        }
    }
}

impl From<&GenerationSettings> for GenerationConfig {
    fn from(s: &GenerationSettings) -> Self {
        Self {
            temperature: s.temperature,
            max_output_tokens: s.max_output_tokens,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub methods: Vec<String>,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, methods: &[&str]) -> Self {
        Self {
            name: name.into(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn supports(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}

/// Lazy, single-pass sequence of text fragments in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String, LlmError>>;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single blocking completion.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, LlmError>;

    /// Incremental completion. Resolves once the backend accepted the request.
    async fn generate_stream(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<FragmentStream, LlmError>;

    /// Look up one model by name.
    async fn get_model(&self, name: &str) -> Result<ModelInfo, LlmError>;

    /// Full model catalog.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError>;

    fn provider(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_wire_names() {
        let config = GenerationConfig {
            temperature: 0.5,
            max_output_tokens: 800,
        };
        let json = serde_json::to_value(config).unwrap();
        assert_eq!(json["maxOutputTokens"], 800);
        assert_eq!(json["temperature"], 0.5);
    }

    #[test]
    fn test_model_supports() {
        let info = ModelInfo::new("gemini-1.5-pro", &["generateContent", "countTokens"]);
        assert!(info.supports("generateContent"));
        assert!(!info.supports("embedContent"));
    }
}
