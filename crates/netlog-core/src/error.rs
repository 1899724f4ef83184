use thiserror::Error;

/// Startup failures. Nothing downstream can run without a credential and a model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("GEMINI_API_KEY is not set (or still holds the placeholder value)")]
    MissingCredential,

    #[error("no compatible model available: {0}")]
    NoCompatibleModel(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Failures local to a single upload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestionError {
    #[error("uploaded file could not be decoded with any supported encoding")]
    UndecodableInput,

    #[error("uploaded file is empty")]
    EmptyUpload,
}
