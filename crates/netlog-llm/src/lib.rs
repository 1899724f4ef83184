// netlog LLM layer - backend clients, model selection and the analysis pipeline

pub mod engine;
pub mod gemini_client;
pub mod llm_client;
pub mod model_selector;
pub mod sse;
#[cfg(any(test, feature = "test-util"))]
pub mod stub_client;

pub use engine::{
    Analysis, AnalysisStream, Analyzer, AnalyzerConfig, BackendError, CompletionResult,
    PreparedRequest,
};
pub use gemini_client::GeminiClient;
pub use llm_client::{FragmentStream, GenerationConfig, LlmClient, LlmError, ModelInfo};
pub use model_selector::{resolve_model, select_model, ModelHandle};
#[cfg(any(test, feature = "test-util"))]
pub use stub_client::StubClient;
