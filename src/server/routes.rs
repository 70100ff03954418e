use crate::config::RuntimeConfig;
use crate::pipeline::run_pipeline;
use crate::server::SERVICE_NAME;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared state for the trigger routes
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<RuntimeConfig>,
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config: Arc::new(config),
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Optional body of `POST /webhook`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRequest {
    #[serde(default = "default_trigger")]
    pub trigger: String,

    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl Default for TriggerRequest {
    fn default() -> Self {
        Self {
            trigger: default_trigger(),
            metadata: None,
        }
    }
}

fn default_trigger() -> String {
    "manual".to_string()
}

/// Builds the trigger server's router
pub fn router(config: RuntimeConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhook", post(trigger))
        .with_state(AppState::new(config))
}

async fn trigger(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        TriggerRequest::default()
    } else {
        match serde_json::from_slice::<TriggerRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Rejected trigger with malformed body: {}", e);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "status": "error",
                        "message": format!("Invalid request body: {}", e),
                        "timestamp": Utc::now().to_rfc3339(),
                    })),
                );
            }
        }
    };

    tracing::info!("Webhook triggered with data: {:?}", request);

    let _guard = state.run_lock.lock().await;
    match run_pipeline(&state.config).await {
        Ok(summary) => {
            tracing::info!("Crawler completed successfully");
            let attempts = summary
                .delivery
                .as_ref()
                .map(|report| report.attempts.len())
                .unwrap_or(0);
            (
                StatusCode::OK,
                Json(json!({
                    "status": "success",
                    "message": "eSIM crawler completed successfully",
                    "data": request,
                    "records": summary.records,
                    "delivery_attempts": attempts,
                    "crawler_output": summary.crawl.stdout,
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
        Err(e) => {
            tracing::error!("Crawler failed at {} stage: {}", e.stage(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "eSIM crawler failed",
                    "stage": e.stage().as_str(),
                    "error": e.to_string(),
                    "data": request,
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "webhook": "POST /webhook - Trigger eSIM device crawling",
            "health": "GET /health - Health check",
            "root": "GET / - This information",
        },
        "usage": "Send POST request to /webhook with optional JSON {\"trigger\": ..., \"metadata\": {...}} to trigger crawling",
    }))
}
