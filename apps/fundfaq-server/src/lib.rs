//! HTTP surface over [`FaqService`].
//!
//! `POST /api/query` answers one question, `GET /api/health` is a liveness
//! probe, and an optional static directory is served at `/`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use fundfaq_answer::{FaqService, QueryOutcome};
use fundfaq_core::config::Settings;

pub const SERVICE_NAME: &str = "Mutual Fund FAQ Chatbot";

/// Shared state. The service is built on the first query and kept for the
/// life of the process; a failed load is not cached, so the next request
/// tries again.
#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    service: Arc<OnceCell<FaqService>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self { settings: Arc::new(settings), service: Arc::new(OnceCell::new()) }
    }

    /// State with an already-built service.
    pub fn with_service(settings: Settings, service: FaqService) -> Self {
        Self { settings: Arc::new(settings), service: Arc::new(OnceCell::with_value(service)) }
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    fn service(&self) -> fundfaq_core::Result<&FaqService> {
        self.service.get_or_try_init(|| {
            info!("loading faq service");
            FaqService::from_settings(&self.settings)
        })
    }
}

#[derive(Serialize)]
struct QueryResponse {
    success: bool,
    question: String,
    answer: String,
    source: Option<String>,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(o: QueryOutcome) -> Self {
        Self { success: true, question: o.question, answer: o.answer, source: o.source }
    }
}

struct ApiError { status: StatusCode, message: String }

impl ApiError {
    fn bad_request(message: &str) -> Self { Self { status: StatusCode::BAD_REQUEST, message: message.to_string() } }
    fn internal(message: impl Into<String>) -> Self { Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() } }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "success": false, "error": self.message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/api/query", post(query))
        .route("/api/health", get(health))
        .with_state(state.clone());
    if let Some(dir) = state.settings().server.static_dir.as_deref() {
        let dir = fundfaq_core::config::expand_path(dir);
        info!(dir = %dir.display(), "serving static files");
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.layer(CorsLayer::permissive()).layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

async fn query(State(state): State<AppState>, body: Bytes) -> Result<Json<QueryResponse>, ApiError> {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let Some(question) = payload.get("question").and_then(Value::as_str) else {
        return Err(ApiError::bad_request("Missing question in request"));
    };
    let question = question.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::bad_request("Question cannot be empty"));
    }

    let outcome = tokio::task::spawn_blocking(move || state.service()?.answer(&question))
        .await
        .map_err(|e| ApiError::internal(format!("query task failed: {e}")))?
        .map_err(|e| {
            error!(error = %e, "query failed");
            ApiError::internal(e.to_string())
        })?;
    Ok(Json(outcome.into()))
}
