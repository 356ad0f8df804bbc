//! Classification service configuration

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use crate::backend::BackendKind;
use crate::engine::{BatchConfig, ExecError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub rest_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    pub backend: BackendKind,
    /// Backend to load when `backend` fails; `None` makes the failure fatal
    #[serde(default)]
    pub fallback_backend: Option<BackendKind>,
    #[serde(default = "default_device")]
    pub device: String,
    pub batch_max_size: usize,
    /// Longest a request waits for company once its batch has started filling
    pub batch_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub labels: Vec<String>,
    pub feature_buckets: usize,
    pub linear_weights: Option<PathBuf>,
    pub openvino_model: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_device() -> String {
    "CPU".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl InferenceConfig {
    /// Batching parameters for the executor, validated
    pub fn batch_config(&self) -> Result<BatchConfig, ExecError> {
        let config = BatchConfig {
            max_batch_size: self.batch_max_size,
            max_delay: Duration::from_millis(self.batch_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn default_path() -> &'static str {
        "config.toml"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig { rest_port: 3000 },
            inference: InferenceConfig {
                backend: BackendKind::Linear,
                fallback_backend: Some(BackendKind::Linear),
                device: default_device(),
                batch_max_size: 8,
                batch_timeout_ms: 5,
                request_timeout_ms: 2000,
            },
            models: ModelsConfig {
                labels: vec!["continue".to_string(), "end_of_turn".to_string()],
                feature_buckets: 4096,
                linear_weights: None,
                openvino_model: None,
            },
            logging: LoggingConfig::default(),
        }
    }
}
