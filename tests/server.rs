//! HTTP surface tests driven through the router with `tower::ServiceExt`.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use docreport::pipeline::llm::{ChatClient, ChatReply, ChatRequest};
use docreport::server::{router, AppState};
use docreport::{AnalysisConfig, FeedbackStore, MemoryFeedbackStore, ReportError};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "docreport-test-boundary";

// ── Fixtures ─────────────────────────────────────────────────────────────────

enum Reply {
    Markdown(&'static str),
    Unauthorised,
}

struct MockChat(Reply);

#[async_trait]
impl ChatClient for MockChat {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, ReportError> {
        assert!(!request.messages.is_empty());
        match self.0 {
            Reply::Markdown(md) => Ok(ChatReply {
                content: md.to_string(),
                prompt_tokens: 12,
                completion_tokens: 8,
            }),
            Reply::Unauthorised => Err(ReportError::AuthError {
                provider: "mock".into(),
                detail: "bad key".into(),
            }),
        }
    }
}

struct Harness {
    app: Router,
    feedback: Arc<MemoryFeedbackStore>,
}

fn harness_with(config: AnalysisConfig, chat: Option<Reply>) -> Harness {
    let feedback = Arc::new(MemoryFeedbackStore::new());
    let chat = chat.map(|r| Arc::new(MockChat(r)) as Arc<dyn ChatClient>);
    let state = AppState::new(config, chat, feedback.clone());
    Harness {
        app: router(state),
        feedback,
    }
}

fn harness() -> Harness {
    harness_with(
        AnalysisConfig::default(),
        Some(Reply::Markdown("```markdown\n# Report\n* step one\n```")),
    )
}

fn multipart(field: &str, file_name: &str, mime: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ── /parse ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn parse_returns_cleaned_markdown() {
    let h = harness();
    let body = multipart("file", "protocol.txt", "text/plain", b"Add 5 ml buffer.");
    let (status, json) = send_json(&h.app, upload("/parse", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "# Report\n- step one\n");
    assert_eq!(json["fileName"], "protocol.txt");
}

#[tokio::test]
async fn parse_can_return_a_pdf() {
    let h = harness();
    let body = multipart("file", "protocol.txt", "text/plain", b"Add 5 ml buffer.");
    let response = h
        .app
        .clone()
        .oneshot(upload("/parse?format=pdf", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("protocol-analysis.pdf"), "{disposition}");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn parse_without_file_field_is_rejected() {
    let h = harness();
    let body = multipart("attachment", "protocol.txt", "text/plain", b"text");
    let (status, json) = send_json(&h.app, upload("/parse", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "MISSING_FILE");
    assert!(json["error"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn parse_rejects_unsupported_types() {
    let h = harness();
    let body = multipart("file", "scan.png", "image/png", &[0x89, b'P', b'N', b'G']);
    let (status, json) = send_json(&h.app, upload("/parse", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "UNSUPPORTED_FILE_TYPE");
}

#[tokio::test]
async fn parse_rejects_blank_documents() {
    let h = harness();
    let body = multipart("file", "empty.txt", "text/plain", b"  \n\t ");
    let (status, json) = send_json(&h.app, upload("/parse", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "EMPTY_EXTRACTION");
}

#[tokio::test]
async fn parse_enforces_upload_limit() {
    let config = AnalysisConfig::builder().max_upload_bytes(16).build().unwrap();
    let h = harness_with(config, Some(Reply::Markdown("# unused")));
    let body = multipart("file", "big.txt", "text/plain", &[b'a'; 64]);
    let (status, json) = send_json(&h.app, upload("/parse", body)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "FILE_TOO_LARGE");
}

#[tokio::test]
async fn parse_rejects_unknown_format() {
    let h = harness();
    let body = multipart("file", "protocol.txt", "text/plain", b"text");
    let (status, json) = send_json(&h.app, upload("/parse?format=docx", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_UPLOAD");
}

#[tokio::test]
async fn parse_without_vendor_is_unavailable() {
    let h = harness_with(AnalysisConfig::default(), None);
    let body = multipart("file", "protocol.txt", "text/plain", b"text");
    let (status, json) = send_json(&h.app, upload("/parse", body)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "PROVIDER_NOT_CONFIGURED");
}

#[tokio::test]
async fn vendor_errors_surface_as_bad_gateway() {
    let h = harness_with(AnalysisConfig::default(), Some(Reply::Unauthorised));
    let body = multipart("file", "protocol.txt", "text/plain", b"text");
    let (status, json) = send_json(&h.app, upload("/parse", body)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "LLM_AUTH_ERROR");
}

#[tokio::test]
async fn parse_status_message() {
    let h = harness();
    let (status, json) = send_json(&h.app, get("/parse")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Parse API endpoint is working");
}

#[tokio::test]
async fn upload_answers_with_message() {
    let h = harness();
    let body = multipart("file", "protocol.txt", "text/plain", b"Add 5 ml buffer.");
    let (status, json) = send_json(&h.app, upload("/upload", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "# Report\n- step one\n");

    let (_, json) = send_json(&h.app, get("/upload")).await;
    assert_eq!(json["message"], "Upload API endpoint is working");
}

// ── /feedback ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn feedback_is_stored() {
    let h = harness();
    let payload = json!({
        "firstName": " Ada ",
        "lastName": "Lovelace",
        "opinion": "Saved us a week of pipetting."
    });
    let (status, json) = send_json(&h.app, post_json("/feedback", &payload.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "success": true }));

    let stored = h.feedback.list(10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].first_name, "Ada");
    assert_eq!(stored[0].opinion, "Saved us a week of pipetting.");
}

#[tokio::test]
async fn feedback_requires_every_field() {
    let h = harness();
    for payload in [
        json!({ "firstName": "Ada", "lastName": "Lovelace" }),
        json!({ "firstName": "Ada", "lastName": "   ", "opinion": "ok" }),
    ] {
        let (status, json) =
            send_json(&h.app, post_json("/feedback", &payload.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_FEEDBACK");
    }
    assert!(h.feedback.list(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn feedback_rejects_malformed_json() {
    let h = harness();
    let (status, json) = send_json(&h.app, post_json("/feedback", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_FEEDBACK");
}

// ── /test, /features, /health ────────────────────────────────────────────────

#[tokio::test]
async fn test_endpoints_echo() {
    let h = harness();
    let (status, json) = send_json(&h.app, get("/test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "API is working");

    let (status, json) = send_json(&h.app, post_json("/test", r#"{"hello":[1,2]}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "POST request is working");
    assert_eq!(json["data"], json!({ "hello": [1, 2] }));
}

#[tokio::test]
async fn features_lists_four_cards() {
    let h = harness();
    let (status, json) = send_json(&h.app, get("/features")).await;
    assert_eq!(status, StatusCode::OK);
    let cards = json.as_array().unwrap();
    assert_eq!(cards.len(), 4);
    assert!(cards.iter().all(|c| c["title"].is_string()));
}

#[tokio::test]
async fn health_reports_vendor_state() {
    let (_, json) = send_json(&harness().app, get("/health")).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["llm_configured"], true);

    let h = harness_with(AnalysisConfig::default(), None);
    let (status, json) = send_json(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["llm_configured"], false);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let h = harness();
    let (status, _) = send(&h.app, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
