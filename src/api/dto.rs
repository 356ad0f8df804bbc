//! REST API request/response data transfer objects

use serde::{Deserialize, Serialize};

use crate::engine::StatsSnapshot;
use crate::service::LabelScore;

/// Classify request
#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
    /// Overrides the configured request timeout
    pub timeout_ms: Option<u64>,
}

/// Classify response
#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub request_id: String,
    pub label: String,
    pub confidence: f32,
    pub probabilities: Vec<LabelScore>,
    pub inference_time_ms: u64,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub backend: String,
    pub labels: Vec<String>,
    pub queue_depth: usize,
    pub uptime_seconds: u64,
}

/// Metrics response
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub executor: StatsSnapshot,
    pub queue_depth: usize,
    pub uptime_seconds: u64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}
