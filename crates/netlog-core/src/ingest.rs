//! Upload ingestion: decoding, descriptive counts and the character budget.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::IngestionError;

pub const DEFAULT_MAX_LOG_CHARS: usize = 15_000;
pub const DEFAULT_PREVIEW_CHARS: usize = 500;
pub const DEFAULT_SIZE_WARNING_BYTES: u64 = 10 * 1024 * 1024;

// ENCODINGS //

/// Character encodings tried, in order, when decoding an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value
    #[serde(rename = "latin-1")]
    Latin1,
}

/// UTF-8 first; Latin-1 accepts any byte sequence so the chain always ends in success.
pub const ENCODING_CANDIDATES: &[TextEncoding] = &[TextEncoding::Utf8, TextEncoding::Latin1];

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Decode with the first candidate that accepts the bytes.
pub fn decode_with(
    bytes: &[u8],
    candidates: &[TextEncoding],
) -> Result<(String, TextEncoding), IngestionError> {
    candidates
        .iter()
        .find_map(|enc| enc.decode(bytes).map(|text| (text, *enc)))
        .ok_or(IngestionError::UndecodableInput)
}

// SIZING //

/// Human readable size: bytes below 1 KB, then KB, then MB.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{:.2} MB", b / MB)
    }
}

/// Number of `\n` occurrences.
pub fn count_lines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// Longest prefix of `text` holding at most `budget` characters.
///
/// Counts `char`s, not bytes, so a multi-byte code point is never split.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

// UPLOADED LOG //

/// One uploaded file, decoded. Lives for a single request.
#[derive(Debug, Clone)]
pub struct UploadedLog {
    pub file_name: String,
    pub raw: Vec<u8>,
    pub text: String,
    pub encoding: TextEncoding,
    pub line_count: usize,
}

impl UploadedLog {
    pub fn from_bytes(
        file_name: impl Into<String>,
        raw: impl Into<Vec<u8>>,
    ) -> Result<Self, IngestionError> {
        let file_name = file_name.into();
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IngestionError::EmptyUpload);
        }

        let (text, encoding) = decode_with(&raw, ENCODING_CANDIDATES)?;
        let line_count = count_lines(&text);

        debug!(
            file = %file_name,
            size_bytes = raw.len(),
            encoding = encoding.label(),
            line_count,
            "Upload decoded"
        );

        Ok(Self {
            file_name,
            raw,
            text,
            encoding,
            line_count,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.raw.len() as u64
    }

    pub fn size_human(&self) -> String {
        format_size(self.size_bytes())
    }

    /// Advisory warning when the upload is larger than `threshold` bytes.
    pub fn size_warning(&self, threshold: u64) -> Option<String> {
        if self.size_bytes() <= threshold {
            return None;
        }
        warn!(
            file = %self.file_name,
            size_bytes = self.size_bytes(),
            threshold,
            "Upload exceeds advisory size"
        );
        Some(format!(
            "File is {} (over {}); only the first part of it will be analyzed.",
            self.size_human(),
            format_size(threshold)
        ))
    }

    /// Raw decoded text for display. Independent of the analysis sample.
    pub fn preview(&self, chars: usize) -> &str {
        truncate_chars(&self.text, chars)
    }

    /// Prefix of the decoded text sent to the model.
    pub fn sample(&self, budget: usize) -> LogSample<'_> {
        let text = truncate_chars(&self.text, budget);
        LogSample {
            text,
            truncated: text.len() < self.text.len(),
            budget,
        }
    }

    pub fn metadata(&self, preview_chars: usize, size_warning_bytes: u64) -> LogMetadata {
        LogMetadata {
            file_name: self.file_name.clone(),
            size_bytes: self.size_bytes(),
            size_human: self.size_human(),
            line_count: self.line_count,
            encoding: self.encoding,
            preview: self.preview(preview_chars).to_string(),
            warning: self.size_warning(size_warning_bytes),
        }
    }
}

/// The portion of the log actually sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSample<'a> {
    pub text: &'a str,
    pub truncated: bool,
    pub budget: usize,
}

impl LogSample<'_> {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// What the page shows right after an upload.
#[derive(Debug, Clone, Serialize)]
pub struct LogMetadata {
    pub file_name: String,
    pub size_bytes: u64,
    pub size_human: String,
    pub line_count: usize,
    pub encoding: TextEncoding,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_is_preferred() {
        let log = UploadedLog::from_bytes("proxy.log", "GET café.example 200\n").unwrap();
        assert_eq!(log.encoding, TextEncoding::Utf8);
        assert_eq!(log.text, "GET café.example 200\n");
    }

    #[test]
    fn test_latin1_fallback() {
        // 0xE9 alone is not valid UTF-8
        let raw = vec![b'c', b'a', b'f', 0xE9, b'\n'];
        let log = UploadedLog::from_bytes("proxy.log", raw).unwrap();
        assert_eq!(log.encoding, TextEncoding::Latin1);
        assert_eq!(log.text, "café\n");
        assert_eq!(log.line_count, 1);
    }

    #[test]
    fn test_serialized_encoding_matches_label() {
        for encoding in ENCODING_CANDIDATES {
            assert_eq!(serde_json::to_value(encoding).unwrap(), encoding.label());
        }
    }

    #[test]
    fn test_no_candidate_is_undecodable() {
        assert_eq!(
            decode_with(&[0xFF, 0xFE], &[TextEncoding::Utf8]),
            Err(IngestionError::UndecodableInput)
        );
    }

    #[test]
    fn test_empty_upload_rejected() {
        let err = UploadedLog::from_bytes("empty.log", Vec::new()).unwrap_err();
        assert_eq!(err, IngestionError::EmptyUpload);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ééééé";
        assert_eq!(truncate_chars(text, 3), "ééé");
        assert_eq!(truncate_chars(text, 10), text);
        assert_eq!(truncate_chars(text, 0), "");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.00 MB");
    }

    #[test]
    fn test_size_warning_threshold() {
        let log = UploadedLog::from_bytes("a.log", vec![b'a'; 2048]).unwrap();
        assert!(log.size_warning(2048).is_none());
        assert!(log.size_warning(1024).is_some());
    }

    #[test]
    fn test_preview_independent_of_sample() {
        let text = "x".repeat(1_000);
        let log = UploadedLog::from_bytes("a.log", text.as_bytes()).unwrap();
        assert_eq!(log.preview(500).len(), 500);
        let sample = log.sample(800);
        assert_eq!(sample.text.len(), 800);
        assert!(sample.truncated);
    }
}
