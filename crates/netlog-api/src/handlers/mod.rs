mod analyze;
mod preview;
mod report;
mod status;

pub use analyze::*;
pub use preview::*;
pub use report::*;
pub use status::*;

use axum::{
    Json,
    body::Bytes,
    http::{HeaderMap, StatusCode},
};
use netlog_core::UploadedLog;

use crate::models::ApiError;

/// Header carrying the uploaded file's name, percent-encoded by the page.
pub const FILE_NAME_HEADER: &str = "x-file-name";
pub const DEFAULT_FILE_NAME: &str = "upload.log";

pub fn file_name(headers: &HeaderMap) -> String {
    headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| urlencoding::decode(v).ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

/// Raw request body -> decoded upload.
pub fn read_upload(
    headers: &HeaderMap,
    body: Bytes,
) -> Result<UploadedLog, (StatusCode, Json<ApiError>)> {
    UploadedLog::from_bytes(file_name(headers), body.to_vec()).map_err(ApiError::ingestion)
}
