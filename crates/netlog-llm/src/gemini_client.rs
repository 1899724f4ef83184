// Google Gemini client (generativelanguage v1beta REST API)

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use netlog_core::{Credential, Settings};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm_client::{FragmentStream, GenerationConfig, LlmClient, LlmError, ModelInfo};
use crate::model_selector::{GENERATE_METHOD, STREAM_METHOD};
use crate::sse::sse_events;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Credential,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateResponse {
    /// Text of the first candidate; empty when the chunk carries no parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }

    fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
    }
}

impl From<ModelEntry> for ModelInfo {
    fn from(entry: ModelEntry) -> Self {
        let mut methods = entry.supported_generation_methods;
        // every generateContent model also serves streamGenerateContent,
        // the catalog just does not always say so
        if methods.iter().any(|m| m == GENERATE_METHOD) && !methods.iter().any(|m| m == STREAM_METHOD) {
            methods.push(STREAM_METHOD.to_string());
        }
        ModelInfo {
            name: strip_models_prefix(&entry.name).to_string(),
            methods,
        }
    }
}

fn strip_models_prefix(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

/// One decoded `streamGenerateContent` event.
#[derive(Debug, PartialEq)]
struct StreamChunk {
    text: String,
    finish_reason: Option<String>,
}

fn parse_stream_chunk(data: &str) -> Result<StreamChunk, LlmError> {
    let chunk: GenerateResponse = serde_json::from_str(data)
        .map_err(|e| LlmError::MalformedResponse(format!("stream chunk: {}", e)))?;
    if let Some(reason) = chunk.block_reason() {
        return Err(LlmError::Blocked(reason.to_string()));
    }
    Ok(StreamChunk {
        text: chunk.text(),
        finish_reason: chunk.finish_reason().map(str::to_string),
    })
}

fn empty_completion(finish_reason: Option<&str>) -> LlmError {
    LlmError::MalformedResponse(format!(
        "empty completion (finish reason: {})",
        finish_reason.unwrap_or("no candidates")
    ))
}

struct ChunkState {
    chunks: BoxStream<'static, Result<StreamChunk, LlmError>>,
    seen_text: bool,
    finish_reason: Option<String>,
    done: bool,
}

/// Fragments of a streamed completion. A stream that closes without any text
/// fails the same way an empty `generateContent` reply does.
fn chunk_texts(chunks: BoxStream<'static, Result<StreamChunk, LlmError>>) -> FragmentStream {
    let state = ChunkState {
        chunks,
        seen_text: false,
        finish_reason: None,
        done: false,
    };
    futures::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        match st.chunks.next().await {
            Some(Ok(chunk)) => {
                st.seen_text |= !chunk.text.is_empty();
                if chunk.finish_reason.is_some() {
                    st.finish_reason = chunk.finish_reason;
                }
                Some((Ok(chunk.text), st))
            }
            Some(Err(e)) => {
                st.done = true;
                Some((Err(e), st))
            }
            None => {
                st.done = true;
                if st.seen_text {
                    None
                } else {
                    let err = empty_completion(st.finish_reason.as_deref());
                    Some((Err(err), st))
                }
            }
        }
    })
    .boxed()
}

/// Pull the human message out of a Gemini error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

async fn check_status(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::ApiError {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

impl GeminiClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(api_key: Credential) -> Result<Self, LlmError> {
        Self::with_options(
            api_key,
            Self::DEFAULT_BASE_URL,
            Duration::from_secs(120),
            Duration::from_secs(10),
        )
    }

    pub fn with_options(
        api_key: Credential,
        base_url: impl Into<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build from loaded settings (base URL and timeouts).
    pub fn from_settings(api_key: Credential, settings: &Settings) -> Result<Self, LlmError> {
        Self::with_options(
            api_key,
            settings.api_base_url.clone(),
            Duration::from_secs(settings.generation.request_timeout_secs),
            Duration::from_secs(settings.generation.connect_timeout_secs),
        )
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!("{}/models/{}{}", self.base_url, strip_models_prefix(model), action)
    }

    fn request_body<'a>(prompt: &'a str, config: &'a GenerationConfig) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: config,
        }
    }

    async fn post_generate(
        &self,
        url: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Response, LlmError> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(&Self::request_body(prompt, config))
            .send()
            .await?;
        check_status(response).await
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, LlmError> {
        let url = self.model_url(model, ":generateContent");
        let response = self.post_generate(&url, prompt, config).await?;

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        if let Some(reason) = result.block_reason() {
            return Err(LlmError::Blocked(reason.to_string()));
        }
        let text = result.text();
        if text.is_empty() {
            return Err(empty_completion(result.finish_reason()));
        }
        Ok(text)
    }

    async fn generate_stream(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<FragmentStream, LlmError> {
        let url = self.model_url(model, ":streamGenerateContent?alt=sse");
        let response = self.post_generate(&url, prompt, config).await?;
        debug!(model, "Stream opened");
        let chunks = sse_events(response.bytes_stream(), parse_stream_chunk);
        Ok(chunk_texts(chunks))
    }

    async fn get_model(&self, name: &str) -> Result<ModelInfo, LlmError> {
        let url = self.model_url(name, "");
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.api_key.expose())
            .send()
            .await?;
        let entry: ModelEntry = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        Ok(entry.into())
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}/models?pageSize=1000", self.base_url);
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(&urlencoding::encode(token));
            }

            let response = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, self.api_key.expose())
                .send()
                .await?;
            let page: ListModelsResponse = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

            models.extend(page.models.into_iter().map(ModelInfo::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = models.len(), "Model catalog fetched");
        Ok(models)
    }

    fn provider(&self) -> &str {
        "gemini"
    }
}
