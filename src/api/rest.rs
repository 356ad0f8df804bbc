//! Axum REST API handlers

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    routing::{get, post},
    extract::{State, DefaultBodyLimit},
    http::StatusCode,
    response::Json,
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::engine::ExecError;
use crate::service::Classifier;

use super::dto::*;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Application state shared across handlers
pub struct AppState {
    pub service: Arc<Classifier>,
    pub start_time: Instant,
}

/// Create the REST API router
pub fn create_rest_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/classify", post(classify_handler))
        // System endpoints
        .route("/health", get(health_handler))
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn exec_error_response(e: ExecError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &e {
        ExecError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
        ExecError::Closed => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INFERENCE_FAILED"),
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Classification failed: {}", e);
    } else {
        warn!("Classification not served: {}", e);
    }
    (status, Json(ErrorResponse::new(&e.to_string(), code)))
}

/// Classify one utterance
async fn classify_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClassifyRequest>,
) -> ApiResult<ClassifyResponse> {
    let start = Instant::now();

    if request.text.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::new("Text must not be empty", "INVALID_INPUT"))));
    }

    let timeout = request.timeout_ms.map(Duration::from_millis);
    let result = state
        .service
        .classify_async(request.text, timeout)
        .await
        .map_err(exec_error_response)?;

    Ok(Json(ClassifyResponse {
        request_id: Uuid::new_v4().to_string(),
        label: result.label,
        confidence: result.confidence,
        probabilities: result.probabilities,
        inference_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Health check handler
async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Json<HealthResponse> {
    let health = state.service.health();

    Json(HealthResponse {
        healthy: health.healthy,
        version: health.version,
        backend: health.backend,
        labels: health.labels,
        queue_depth: health.queue_depth,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Metrics handler
async fn metrics_handler(
    State(state): State<Arc<AppState>>,
) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        executor: state.service.stats(),
        queue_depth: state.service.health().queue_depth,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
