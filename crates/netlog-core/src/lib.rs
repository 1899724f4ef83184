//! Core types for the network log analyzer.
//! Ingestion, prompt construction, settings and report export; no network I/O here.

pub mod config;
pub mod error;
pub mod ingest;
pub mod prompt;
pub mod report;

pub use config::{load_credential, Credential, Settings};
pub use error::{ConfigurationError, IngestionError};
pub use ingest::{LogMetadata, LogSample, TextEncoding, UploadedLog};
pub use prompt::{build_prompt, PromptText, REPORT_SECTIONS};
pub use report::{export_report, AnalysisReport, ReportArtifact};
