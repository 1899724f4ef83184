use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::StreamExt;
use netlog_core::config::ModelSettings;
use netlog_core::Credential;
use netlog_llm::model_selector::{GENERATE_METHOD, STREAM_METHOD};
use netlog_llm::{resolve_model, GeminiClient, GenerationConfig, LlmClient, LlmError};
use serde_json::{json, Value};

const KEY: &str = "test-key";

const STREAM_BODY: &str = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"AB\"}],\"role\":\"model\"}}]}\r\n\r\n\
data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"CDE\"}],\"role\":\"model\"}}]}\r\n\r\n\
data: {\"candidates\":[{\"finishReason\":\"STOP\"}],\"usageMetadata\":{\"totalTokenCount\":12}}\r\n\r\n";

const BLOCKED_STREAM_BODY: &str = "data: {\"candidates\":[{\"finishReason\":\"SAFETY\"}]}\n\n";

fn api_error(status: StatusCode, message: &str) -> Response {
    let body = json!({"error": {"code": status.as_u16(), "message": message}});
    (status, Json(body)).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("x-goog-api-key")
        .is_some_and(|v| v.as_bytes() == KEY.as_bytes())
}

fn model_entry(name: &str, methods: &[&str]) -> Value {
    json!({"name": format!("models/{name}"), "supportedGenerationMethods": methods})
}

async fn list_models(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::BAD_REQUEST, "API key not valid. Please pass a valid API key.");
    }
    match query.get("pageToken").map(String::as_str) {
        None => Json(json!({
            "models": [model_entry("gemini-1.5-pro", &["generateContent", "countTokens"])],
            "nextPageToken": "page 2",
        }))
        .into_response(),
        Some("page 2") => Json(json!({
            "models": [
                model_entry("gemini-2.5-flash", &["generateContent", "streamGenerateContent"]),
                model_entry("text-embedding-004", &["embedContent"]),
            ],
        }))
        .into_response(),
        Some(other) => api_error(StatusCode::BAD_REQUEST, &format!("bad page token {other}")),
    }
}

async fn get_model(headers: HeaderMap, Path(name): Path<String>) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::BAD_REQUEST, "API key not valid. Please pass a valid API key.");
    }
    match name.as_str() {
        "gemini-2.5-flash" => {
            Json(model_entry("gemini-2.5-flash", &["generateContent", "streamGenerateContent"]))
                .into_response()
        }
        _ => api_error(StatusCode::NOT_FOUND, &format!("models/{name} is not found")),
    }
}

async fn generate(headers: HeaderMap, Path(target): Path<String>, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::BAD_REQUEST, "API key not valid. Please pass a valid API key.");
    }
    if body["contents"][0]["parts"][0]["text"].as_str().is_none() {
        return api_error(StatusCode::BAD_REQUEST, "contents missing");
    }
    let sse = |text: &'static str| ([(header::CONTENT_TYPE, "text/event-stream")], text).into_response();

    match target.split_once(':') {
        Some(("gemini-2.5-flash", "generateContent")) => Json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "RESULT"}], "role": "model"},
                "finishReason": "STOP",
            }],
        }))
        .into_response(),
        Some(("gemini-2.5-flash", "streamGenerateContent")) => sse(STREAM_BODY),
        Some(("gemini-blocked", "generateContent")) => {
            Json(json!({"candidates": [{"finishReason": "SAFETY"}]})).into_response()
        }
        Some(("gemini-blocked", "streamGenerateContent")) => sse(BLOCKED_STREAM_BODY),
        _ => api_error(StatusCode::NOT_FOUND, &format!("models/{target} is not found")),
    }
}

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route("/v1beta/models", get(list_models))
        .route("/v1beta/models/{name}", get(get_model).post(generate));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

fn client(addr: SocketAddr, key: &str) -> GeminiClient {
    GeminiClient::with_options(
        Credential::new(key).unwrap(),
        format!("http://{addr}/v1beta/"),
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_list_models_follows_pages() {
    let gemini = client(serve().await, KEY);
    let models = gemini.list_models().await.unwrap();

    let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["gemini-1.5-pro", "gemini-2.5-flash", "text-embedding-004"]);
    assert!(models[0].supports(STREAM_METHOD));
    assert!(!models[2].supports(GENERATE_METHOD));
}

#[tokio::test]
async fn test_wrong_key_is_api_error() {
    let gemini = client(serve().await, "wrong-key");
    match gemini.list_models().await {
        Err(LlmError::ApiError { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.starts_with("API key not valid"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_get_model() {
    let gemini = client(serve().await, KEY);

    let info = gemini.get_model("models/gemini-2.5-flash").await.unwrap();
    assert_eq!(info.name, "gemini-2.5-flash");
    assert!(info.supports(STREAM_METHOD));

    let err = gemini.get_model("gemini-9").await.unwrap_err();
    assert_eq!(err.to_string(), "API error (404): models/gemini-9 is not found");
}

#[tokio::test]
async fn test_resolve_model_against_catalog() {
    let gemini = client(serve().await, KEY);
    let handle = resolve_model(&gemini, &ModelSettings::default()).await.unwrap();
    assert_eq!(handle.name, "gemini-2.5-flash");
    assert!(handle.supports_streaming);
}

#[tokio::test]
async fn test_generate() {
    let gemini = client(serve().await, KEY);
    let config = GenerationConfig::default();

    let text = gemini.generate("gemini-2.5-flash", "prompt", &config).await.unwrap();
    assert_eq!(text, "RESULT");

    let err = gemini.generate("gemini-blocked", "prompt", &config).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Malformed response: empty completion (finish reason: SAFETY)"
    );
}

#[tokio::test]
async fn test_generate_stream_fragments() {
    let gemini = client(serve().await, KEY);
    let stream = gemini
        .generate_stream("gemini-2.5-flash", "prompt", &GenerationConfig::default())
        .await
        .unwrap();

    let fragments: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
    assert_eq!(fragments, vec!["AB", "CDE", ""]);
    assert_eq!(fragments.concat(), "ABCDE");
}

#[tokio::test]
async fn test_stream_without_text_fails_like_generate() {
    let gemini = client(serve().await, KEY);
    let stream = gemini
        .generate_stream("gemini-blocked", "prompt", &GenerationConfig::default())
        .await
        .unwrap();

    let items: Vec<Result<String, LlmError>> = stream.collect().await;
    match items.last() {
        Some(Err(LlmError::MalformedResponse(message))) => {
            assert_eq!(message, "empty completion (finish reason: SAFETY)")
        }
        other => panic!("unexpected tail: {other:?}"),
    }
}
