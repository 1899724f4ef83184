use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use netlog_llm::AnalysisStream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{info, warn};

use super::read_upload;
use crate::models::{AnalyzeResponse, ApiError, StreamDone, StreamFragment, StreamMeta};
use crate::state::AppState;

/// Handler: POST /api/analyze
pub async fn analyze_log(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, (StatusCode, Json<ApiError>)> {
    let analyzer = state.analyzer()?;
    let log = read_upload(&headers, body)?;
    let ingest = &state.settings.ingest;
    let metadata = log.metadata(ingest.preview_chars, ingest.size_warning_bytes);

    let analysis = analyzer.analyze(&log).await.map_err(ApiError::backend)?;
    let report = analysis.into_report();

    info!(
        id = %report.id,
        model = %report.model,
        time_ms = report.response_time_ms as u64,
        "Analyze request served"
    );

    Ok(Json(AnalyzeResponse {
        metadata,
        report,
        provider: analyzer.provider().to_string(),
    }))
}

enum Phase {
    Meta(StreamMeta, AnalysisStream),
    Streaming(AnalysisStream),
    Finished,
}

fn event<T: Serialize>(name: &str, data: &T) -> Result<Event, Infallible> {
    Ok(Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
}

/// Handler: POST /api/analyze/stream
///
/// Events: `meta`, then one `fragment` per backend fragment, then `done` or `error`.
pub async fn analyze_log_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ApiError>)> {
    let analyzer = state.analyzer()?;
    let log = read_upload(&headers, body)?;
    let ingest = &state.settings.ingest;
    let metadata = log.metadata(ingest.preview_chars, ingest.size_warning_bytes);

    let analysis = analyzer.analyze_stream(&log).await.map_err(ApiError::backend)?;
    let request = analysis.request();
    let meta = StreamMeta {
        id: request.id.to_string(),
        model: analyzer.model().name.clone(),
        metadata,
        analyzed_chars: request.sample_chars,
        truncated: request.truncated,
    };

    let events = stream::unfold(Phase::Meta(meta, analysis), |phase| async move {
        match phase {
            Phase::Meta(meta, analysis) => Some((event("meta", &meta), Phase::Streaming(analysis))),
            Phase::Streaming(mut analysis) => match analysis.next_fragment().await {
                Some(Ok(text)) => {
                    let fragment = StreamFragment {
                        index: analysis.fragments_received() - 1,
                        text,
                    };
                    Some((event("fragment", &fragment), Phase::Streaming(analysis)))
                }
                Some(Err(e)) => {
                    warn!(fragments = analysis.fragments_received(), error = %e, "Stream aborted");
                    let body = ApiError {
                        error: e.to_string(),
                        code: StatusCode::BAD_GATEWAY.as_u16(),
                    };
                    Some((event("error", &body), Phase::Finished))
                }
                None => {
                    let done = analysis.finish();
                    let payload = StreamDone {
                        text: done.result.text(),
                        fragments: done.result.fragment_count(),
                        time_ms: done.elapsed.as_millis(),
                    };
                    Some((event("done", &payload), Phase::Finished))
                }
            },
            Phase::Finished => None,
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
