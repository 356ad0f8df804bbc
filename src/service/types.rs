//! Service layer types

use serde::{Deserialize, Serialize};

/// Probability assigned to one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub probability: f32,
}

/// Classification result for one utterance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
    /// Full distribution, in label order
    pub probabilities: Vec<LabelScore>,
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResult {
    pub healthy: bool,
    pub version: String,
    pub backend: String,
    pub labels: Vec<String>,
    pub queue_depth: usize,
}
