use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use fundfaq_answer::{ExtractiveComposer, FaqService};
use fundfaq_core::config::{EmbeddingBackend, Settings};
use fundfaq_core::types::{Chunk, ChunkKind, ChunkMetadata};
use fundfaq_embed::HashingEmbedder;
use fundfaq_server::{router, AppState, SERVICE_NAME};
use fundfaq_vector::{IndexBuilder, Retriever};

const VALUE_URL: &str = "https://groww.in/mutual-funds/jm-basic-fund-direct-growth";

fn settings_for(store: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.embedding.backend = EmbeddingBackend::Hashing;
    settings.data.vector_dir = store.to_string_lossy().into_owned();
    settings
}

fn build_store(store: &Path) {
    let chunks = vec![
        Chunk::new(
            format!("JM Value Fund - Expense Ratio: 0.98%. Source: {VALUE_URL}"),
            ChunkMetadata::new(ChunkKind::SchemeAttribute, VALUE_URL).with_scheme("JM Value Fund").with_field("expense_ratio"),
        ),
        Chunk::new(
            format!("JM Value Fund - Exit Load: Exit load of 1% if redeemed within 30 days. Source: {VALUE_URL}"),
            ChunkMetadata::new(ChunkKind::SchemeAttribute, VALUE_URL).with_scheme("JM Value Fund").with_field("exit_load"),
        ),
    ];
    IndexBuilder::new(Arc::new(HashingEmbedder::new(384))).build_and_save(chunks, store).unwrap();
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_query(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_service_name() {
    let tmp = TempDir::new().unwrap();
    let app = router(AppState::new(settings_for(tmp.path())));
    let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy", "service": SERVICE_NAME}));
}

#[tokio::test]
async fn question_is_answered_with_source() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("vector_store");
    build_store(&store);
    let app = router(AppState::new(settings_for(&store)));

    let (status, body) = send(&app, post_query(r#"{"question": "  What is the expense ratio of JM Value Fund?  "}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["question"], "What is the expense ratio of JM Value Fund?");
    assert_eq!(body["source"], VALUE_URL);
    assert!(body["answer"].as_str().unwrap().starts_with("Answer: JM Value Fund - Expense Ratio: 0.98%"));
}

#[tokio::test]
async fn missing_question_is_a_bad_request() {
    let tmp = TempDir::new().unwrap();
    let app = router(AppState::new(settings_for(tmp.path())));

    for body in [r#"{}"#, r#"{"q": "hi"}"#, "not json", ""] {
        let (status, resp) = send(&app, post_query(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(resp, json!({"success": false, "error": "Missing question in request"}));
    }
}

#[tokio::test]
async fn blank_question_is_a_bad_request() {
    let tmp = TempDir::new().unwrap();
    let app = router(AppState::new(settings_for(tmp.path())));
    let (status, resp) = send(&app, post_query(r#"{"question": "   "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "Question cannot be empty");
}

#[tokio::test]
async fn missing_store_is_an_internal_error_until_built() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("vector_store");
    let app = router(AppState::new(settings_for(&store)));

    let (status, resp) = send(&app, post_query(r#"{"question": "exit load"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp["success"], false);
    assert!(resp["error"].as_str().unwrap().contains("fundfaq build"));

    // the failed load is not cached
    build_store(&store);
    let (status, resp) = send(&app, post_query(r#"{"question": "exit load"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["source"], VALUE_URL);
}

#[tokio::test]
async fn static_directory_is_served_at_root() {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path().join("static");
    std::fs::create_dir_all(&site).unwrap();
    std::fs::write(site.join("index.html"), "<h1>FAQ</h1>").unwrap();
    let mut settings = settings_for(tmp.path());
    settings.server.static_dir = Some(site.to_string_lossy().into_owned());
    let app = router(AppState::new(settings));

    let resp = app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>FAQ</h1>");
}

#[tokio::test]
async fn prebuilt_service_answers_without_reloading_the_store() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("vector_store");
    build_store(&store);
    let retriever = Retriever::open(&store, Arc::new(HashingEmbedder::new(384))).unwrap();
    let service = FaqService::new(retriever, Box::new(ExtractiveComposer), 1);
    std::fs::remove_dir_all(&store).unwrap();

    let app = router(AppState::with_service(settings_for(&store), service));
    let (status, resp) = send(&app, post_query(r#"{"question": "exit load"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["source"], VALUE_URL);
}
