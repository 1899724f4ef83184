// Scripted in-memory backend
// Deterministic stand-in for the Gemini client in tests and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;

use crate::llm_client::{FragmentStream, GenerationConfig, LlmClient, LlmError, ModelInfo};
use crate::model_selector::{GENERATE_METHOD, STREAM_METHOD};

#[derive(Debug, Clone)]
enum Reply {
    Fragments(Vec<String>),
    Fail(String),
    FailAfter(Vec<String>, String),
}

#[derive(Debug)]
pub struct StubClient {
    reply: Reply,
    catalog: Vec<ModelInfo>,
    catalog_error: Option<String>,
    fail_first: AtomicUsize,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubClient {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            catalog: vec![ModelInfo::new(
                "gemini-2.5-flash",
                &[GENERATE_METHOD, STREAM_METHOD],
            )],
            catalog_error: None,
            fail_first: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Completes with `text`, streamed as one fragment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_reply(Reply::Fragments(vec![text.into()]))
    }

    /// Streams `fragments` in order; non-streaming calls get their concatenation.
    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_reply(Reply::Fragments(fragments.into_iter().map(Into::into).collect()))
    }

    /// Every generation call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_reply(Reply::Fail(message.into()))
    }

    /// Streams `fragments`, then breaks off with `message`. Non-streaming calls fail outright.
    pub fn failing_after<I, S>(fragments: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_reply(Reply::FailAfter(
            fragments.into_iter().map(Into::into).collect(),
            message.into(),
        ))
    }

    /// The first `n` generation calls fail with a quota error, later ones succeed.
    pub fn failing_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_catalog(mut self, catalog: Vec<ModelInfo>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_catalog_error(mut self, message: impl Into<String>) -> Self {
        self.catalog_error = Some(message.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    /// Fragments to deliver, plus the interruption that follows them, if any.
    fn record(&self, prompt: &str) -> Result<(Vec<String>, Option<LlmError>), LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(LlmError::ApiError {
                status: 429,
                message: "Resource has been exhausted (e.g. check quota).".to_string(),
            });
        }

        match &self.reply {
            Reply::Fragments(parts) => Ok((parts.clone(), None)),
            Reply::FailAfter(parts, message) => {
                Ok((parts.clone(), Some(LlmError::Interrupted(message.clone()))))
            }
            Reply::Fail(message) => Err(LlmError::ApiError {
                status: 500,
                message: message.clone(),
            }),
        }
    }
}

#[async_trait]
impl LlmClient for StubClient {
    async fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, LlmError> {
        match self.record(prompt)? {
            (_, Some(interruption)) => Err(interruption),
            (parts, None) => Ok(parts.concat()),
        }
    }

    async fn generate_stream(
        &self,
        _model: &str,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<FragmentStream, LlmError> {
        let (parts, tail) = self.record(prompt)?;
        let fragments = futures::stream::iter(parts.into_iter().map(Ok));
        let tail = futures::stream::iter(tail.map(Err));
        Ok(fragments.chain(tail).boxed())
    }

    async fn get_model(&self, name: &str) -> Result<ModelInfo, LlmError> {
        self.catalog
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .ok_or_else(|| LlmError::ApiError {
                status: 404,
                message: format!("models/{} is not found", name),
            })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        match &self.catalog_error {
            Some(message) => Err(LlmError::ApiError {
                status: 403,
                message: message.clone(),
            }),
            None => Ok(self.catalog.clone()),
        }
    }

    fn provider(&self) -> &str {
        "stub"
    }
}
