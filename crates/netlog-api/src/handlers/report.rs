use axum::{
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};
use netlog_core::export_report;
use tracing::info;

/// Handler: POST /api/report
///
/// Echoes the completion text back as a `text/plain` attachment.
pub async fn download_report(text: String) -> impl IntoResponse {
    let artifact = export_report(text);
    info!(bytes = artifact.body.len(), file = artifact.file_name, "Report exported");

    (
        [
            (CONTENT_TYPE, format!("{}; charset=utf-8", artifact.mime)),
            (CONTENT_DISPOSITION, artifact.content_disposition()),
        ],
        artifact.body,
    )
}
