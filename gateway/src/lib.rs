//! HTTP boundary for batch key validation.
//!
//! Routes:
//! - `POST /test`     — probe a key against the requested services
//! - `GET  /services` — list the services that can be requested
//! - `GET  /health`   — liveness
//!
//! Cross-origin requests are allowed so browser front ends served from
//! elsewhere can call the gateway directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use engine::{ProbeOutcome, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    validator: Arc<Validator>,
}

impl AppState {
    pub fn new(validator: Validator) -> Self {
        Self { validator: Arc::new(validator) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/test", post(test_key))
        .route("/services", get(list_services))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Wire Types ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TestRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub services: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestResult {
    /// Display name of the service
    pub service: String,
    pub status: bool,
    /// Raw vendor body, or the transport failure description
    pub content: String,
}

impl From<ProbeOutcome> for TestResult {
    fn from(o: ProbeOutcome) -> Self {
        Self {
            service: o.display_name,
            status: o.succeeded,
            content: o.body_or_error,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestResponse {
    pub results: Vec<TestResult>,
}

#[derive(Debug, Serialize)]
struct ServiceEntry<'a> {
    id: &'a str,
    name: &'a str,
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::MissingKey => ApiError::BadRequest("缺少 API Key 参数"),
            ValidationError::NoServices => ApiError::BadRequest("请至少选择一个测试服务"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────────

async fn test_key(
    State(state): State<AppState>,
    Json(req): Json<TestRequest>,
) -> Result<Json<TestResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let key = req.key.unwrap_or_default();
    let services = req.services.unwrap_or_default();

    let span = tracing::info_span!("test", %request_id, services = services.len());
    async move {
        let outcomes = state
            .validator
            .run_validation(&key, &services)
            .await
            .map_err(|e| {
                warn!("Request rejected — {}", e);
                ApiError::from(e)
            })?;

        info!(results = outcomes.len(), "Validation finished");
        Ok::<_, ApiError>(Json(TestResponse {
            results: outcomes.into_iter().map(TestResult::from).collect(),
        }))
    }
    .instrument(span)
    .await
}

async fn list_services(State(state): State<AppState>) -> impl IntoResponse {
    let services: Vec<ServiceEntry> = state
        .validator
        .registry()
        .iter()
        .map(|s| ServiceEntry { id: &s.id, name: &s.display_name })
        .collect();
    Json(serde_json::json!({ "services": services }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
