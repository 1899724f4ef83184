// Analysis engine
// Orchestrates: sample -> prompt -> backend -> accumulated completion

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt;
use netlog_core::{
    build_prompt, load_credential, AnalysisReport, ConfigurationError, LogSample, PromptText,
    Settings, UploadedLog,
};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::gemini_client::GeminiClient;
use crate::llm_client::{FragmentStream, GenerationConfig, LlmClient, LlmError};
use crate::model_selector::{resolve_model, ModelHandle};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

const EMPTY_COMPLETION: &str = "empty completion";

impl From<LlmError> for BackendError {
    fn from(e: LlmError) -> Self {
        BackendError::GenerationFailed(e.to_string())
    }
}

/// Per-request tunables, copied out of the settings once.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub max_log_chars: usize,
    pub generation: GenerationConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_log_chars: netlog_core::ingest::DEFAULT_MAX_LOG_CHARS,
            generation: GenerationConfig::default(),
        }
    }
}

impl From<&Settings> for AnalyzerConfig {
    fn from(s: &Settings) -> Self {
        Self {
            max_log_chars: s.ingest.max_log_chars,
            generation: GenerationConfig::from(&s.generation),
        }
    }
}

/// Backend output for one request: whole, or fragments in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    Single(String),
    Fragments(Vec<String>),
}

impl CompletionResult {
    pub fn text(&self) -> String {
        match self {
            CompletionResult::Single(text) => text.clone(),
            CompletionResult::Fragments(parts) => parts.concat(),
        }
    }

    pub fn fragment_count(&self) -> usize {
        match self {
            CompletionResult::Single(_) => 1,
            CompletionResult::Fragments(parts) => parts.len(),
        }
    }
}

/// Completed analysis of one upload.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub id: Uuid,
    pub file_name: String,
    pub model: String,
    pub result: CompletionResult,
    pub sample_chars: usize,
    pub truncated: bool,
    pub elapsed: Duration,
}

impl Analysis {
    pub fn into_report(self) -> AnalysisReport {
        AnalysisReport {
            id: self.id,
            file_name: self.file_name,
            model: self.model,
            text: self.result.text(),
            fragments: self.result.fragment_count(),
            sample_chars: self.sample_chars,
            truncated: self.truncated,
            generated_at: Utc::now(),
            response_time_ms: self.elapsed.as_millis(),
        }
    }
}

/// What gets sent for one upload, fixed before the backend is called.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub id: Uuid,
    pub file_name: String,
    pub prompt: PromptText,
    pub sample_chars: usize,
    pub truncated: bool,
}

/// A streaming analysis in progress. Single pass; fragments are kept for export.
pub struct AnalysisStream {
    request: PreparedRequest,
    model: String,
    fragments: FragmentStream,
    collected: Vec<String>,
    started: Instant,
    exhausted: bool,
}

impl AnalysisStream {
    pub fn request(&self) -> &PreparedRequest {
        &self.request
    }

    /// Next fragment, already appended to the accumulated text.
    ///
    /// Ends after the first error. A stream that closes without any text
    /// yields one final error instead of ending cleanly.
    pub async fn next_fragment(&mut self) -> Option<Result<String, BackendError>> {
        if self.exhausted {
            return None;
        }
        match self.fragments.next().await {
            Some(Ok(fragment)) => {
                self.collected.push(fragment.clone());
                Some(Ok(fragment))
            }
            Some(Err(e)) => {
                self.exhausted = true;
                error!(id = %self.request.id, fragments = self.collected.len(), error = %e, "Stream failed");
                Some(Err(e.into()))
            }
            None => {
                self.exhausted = true;
                if self.collected.iter().all(|f| f.is_empty()) {
                    error!(id = %self.request.id, fragments = self.collected.len(), "Stream closed without text");
                    return Some(Err(BackendError::GenerationFailed(EMPTY_COMPLETION.to_string())));
                }
                None
            }
        }
    }

    pub fn fragments_received(&self) -> usize {
        self.collected.len()
    }

    /// Text accumulated so far.
    pub fn accumulated(&self) -> String {
        self.collected.concat()
    }

    /// Drain the stream, calling `on_fragment(index, fragment)` for progress.
    pub async fn collect_with<F>(mut self, mut on_fragment: F) -> Result<Analysis, BackendError>
    where
        F: FnMut(usize, &str),
    {
        while let Some(item) = self.next_fragment().await {
            let fragment = item?;
            on_fragment(self.collected.len() - 1, &fragment);
        }
        Ok(self.finish())
    }

    /// Close out after the last fragment.
    pub fn finish(self) -> Analysis {
        let elapsed = self.started.elapsed();
        info!(
            id = %self.request.id,
            model = %self.model,
            fragments = self.collected.len(),
            time_ms = elapsed.as_millis() as u64,
            "Streaming analysis complete"
        );
        Analysis {
            id: self.request.id,
            file_name: self.request.file_name,
            model: self.model,
            result: CompletionResult::Fragments(self.collected),
            sample_chars: self.request.sample_chars,
            truncated: self.request.truncated,
            elapsed,
        }
    }
}

/// The analysis pipeline. Immutable after startup and shared across requests.
pub struct Analyzer {
    client: Arc<dyn LlmClient>,
    model: ModelHandle,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(client: Arc<dyn LlmClient>, model: ModelHandle, config: AnalyzerConfig) -> Self {
        Self {
            client,
            model,
            config,
        }
    }

    /// Startup wiring against Gemini: credential, client, model resolution.
    pub async fn connect(settings: &Settings) -> Result<Self, ConfigurationError> {
        let credential = load_credential()?;
        let client = GeminiClient::from_settings(credential, settings)
            .map_err(|e| ConfigurationError::InvalidSettings(e.to_string()))?;
        let model = resolve_model(&client, &settings.model).await?;
        Ok(Self::new(Arc::new(client), model, AnalyzerConfig::from(settings)))
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn provider(&self) -> &str {
        self.client.provider()
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn sample<'a>(&self, log: &'a UploadedLog) -> LogSample<'a> {
        log.sample(self.config.max_log_chars)
    }

    pub fn prepare(&self, log: &UploadedLog) -> PreparedRequest {
        let sample = self.sample(log);
        let prompt = build_prompt(&sample);
        let prepared = PreparedRequest {
            id: Uuid::new_v4(),
            file_name: log.file_name.clone(),
            prompt,
            sample_chars: sample.char_count(),
            truncated: sample.truncated,
        };
        debug!(
            id = %prepared.id,
            sample_chars = prepared.sample_chars,
            truncated = prepared.truncated,
            prompt_len = prepared.prompt.as_str().len(),
            "Prompt prepared"
        );
        prepared
    }

    /// Non-streaming: wait for the whole completion.
    pub async fn analyze(&self, log: &UploadedLog) -> Result<Analysis, BackendError> {
        let request = self.prepare(log);
        let started = Instant::now();
        info!(id = %request.id, model = %self.model.name, file = %request.file_name, "Analysis started");

        let text = self
            .client
            .generate(&self.model.name, request.prompt.as_str(), &self.config.generation)
            .await
            .map_err(|e| {
                error!(id = %request.id, error = %e, "Generation failed");
                BackendError::from(e)
            })?;
        if text.is_empty() {
            error!(id = %request.id, "Backend returned no text");
            return Err(BackendError::GenerationFailed(EMPTY_COMPLETION.to_string()));
        }

        let elapsed = started.elapsed();
        info!(id = %request.id, time_ms = elapsed.as_millis() as u64, "Analysis complete");

        Ok(Analysis {
            id: request.id,
            file_name: request.file_name,
            model: self.model.name.clone(),
            result: CompletionResult::Single(text),
            sample_chars: request.sample_chars,
            truncated: request.truncated,
            elapsed,
        })
    }

    /// Streaming: returns once the backend accepted the request.
    ///
    /// A model without streaming support yields its whole completion as one fragment.
    pub async fn analyze_stream(&self, log: &UploadedLog) -> Result<AnalysisStream, BackendError> {
        let request = self.prepare(log);
        let started = Instant::now();
        info!(
            id = %request.id,
            model = %self.model.name,
            streaming = self.model.supports_streaming,
            file = %request.file_name,
            "Streaming analysis started"
        );

        let fragments = if self.model.supports_streaming {
            self.client
                .generate_stream(&self.model.name, request.prompt.as_str(), &self.config.generation)
                .await
                .map_err(|e| {
                    error!(id = %request.id, error = %e, "Stream could not be opened");
                    BackendError::from(e)
                })?
        } else {
            let client = Arc::clone(&self.client);
            let model = self.model.name.clone();
            let prompt = request.prompt.as_str().to_string();
            let config = self.config.generation;
            futures::stream::once(async move { client.generate(&model, &prompt, &config).await })
                .boxed()
        };

        Ok(AnalysisStream {
            request,
            model: self.model.name.clone(),
            fragments,
            collected: Vec::new(),
            started,
            exhausted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_text() {
        assert_eq!(CompletionResult::Single("ABCDE".into()).text(), "ABCDE");
        let streamed = CompletionResult::Fragments(vec!["AB".into(), "".into(), "CDE".into()]);
        assert_eq!(streamed.text(), "ABCDE");
        assert_eq!(streamed.fragment_count(), 3);
    }

    #[test]
    fn test_llm_error_maps_to_generation_failed() {
        let err: BackendError = LlmError::ApiError {
            status: 429,
            message: "quota exhausted".into(),
        }
        .into();
        assert_eq!(
            err,
            BackendError::GenerationFailed("API error (429): quota exhausted".into())
        );
    }
}
