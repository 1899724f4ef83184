//! Analysis results and the downloadable report artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const REPORT_FILE_NAME: &str = "network_log_analysis.txt";
pub const REPORT_MIME: &str = "text/plain";

/// Finished analysis of one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub file_name: String,
    pub model: String,
    pub text: String,
    pub fragments: usize,
    pub sample_chars: usize,
    pub truncated: bool,
    pub generated_at: DateTime<Utc>,
    pub response_time_ms: u128,
}

/// A plain-text download. The body is the completion text, byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub body: String,
}

impl ReportArtifact {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

pub fn export_report(text: impl Into<String>) -> ReportArtifact {
    ReportArtifact {
        file_name: REPORT_FILE_NAME,
        mime: REPORT_MIME,
        body: text.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_keeps_text_verbatim() {
        let artifact = export_report("RESULT");
        assert_eq!(artifact.body, "RESULT");
        assert_eq!(artifact.mime, "text/plain");
        assert_eq!(
            artifact.content_disposition(),
            "attachment; filename=\"network_log_analysis.txt\""
        );
    }

    #[test]
    fn test_report_serializes() {
        let report = AnalysisReport {
            id: Uuid::new_v4(),
            file_name: "proxy.log".to_string(),
            model: "gemini-2.5-flash".to_string(),
            text: "summary".to_string(),
            fragments: 3,
            sample_chars: 120,
            truncated: false,
            generated_at: Utc::now(),
            response_time_ms: 42,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["model"], "gemini-2.5-flash");
        assert_eq!(json["fragments"], 3);
    }
}
