//! Classifier Service - Core business logic
//!
//! Wraps the batching executor with label handling: the worker turns logits
//! into a probability distribution, the service names the winning label.

use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::backend;
use crate::config::Config;
use crate::engine::{ExecError, Executor, StatsSnapshot};
use crate::utils::math::{argmax, softmax};

use super::types::*;

/// Text classification service
pub struct Classifier {
    executor: Executor<String, Vec<f32>>,
    labels: Vec<String>,
    request_timeout: Duration,
}

impl Classifier {
    /// Load the configured backend and start the batch worker
    pub fn start(config: &Config) -> Result<Self> {
        let batch = config.inference.batch_config()?;
        let inference = config.inference.clone();
        let models = config.models.clone();

        let executor = Executor::spawn_with_postprocess(
            batch,
            move || backend::build(&inference, &models),
            |logits: Vec<f32>| softmax(&logits),
        )?;

        info!(
            "Classifier ready with {} labels: {}",
            config.models.labels.len(),
            config.models.labels.join(", ")
        );
        Ok(Self::from_executor(executor, config.models.labels.clone()))
    }

    /// Build a classifier around an executor that already yields probabilities
    pub fn from_executor(executor: Executor<String, Vec<f32>>, labels: Vec<String>) -> Self {
        let request_timeout = executor.config().request_timeout;
        Self {
            executor,
            labels,
            request_timeout,
        }
    }

    /// Classify with the configured request timeout, blocking the caller
    pub fn classify(&self, text: &str) -> Result<Classification, ExecError> {
        self.classify_with_timeout(text, self.request_timeout)
    }

    pub fn classify_with_timeout(&self, text: &str, timeout: Duration) -> Result<Classification, ExecError> {
        let probs = self.executor.submit(text.to_string(), timeout)?;
        Ok(self.label(probs))
    }

    /// Async classification; `timeout` defaults to the configured request timeout
    pub async fn classify_async(
        &self,
        text: String,
        timeout: Option<Duration>,
    ) -> Result<Classification, ExecError> {
        let timeout = timeout.unwrap_or(self.request_timeout);
        let probs = self.executor.submit_async(text, timeout).await?;
        Ok(self.label(probs))
    }

    fn label(&self, probs: Vec<f32>) -> Classification {
        let best = argmax(&probs);
        let name = |i: usize| {
            self.labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", i))
        };

        Classification {
            label: name(best),
            confidence: probs.get(best).copied().unwrap_or(0.0),
            probabilities: probs
                .iter()
                .enumerate()
                .map(|(i, &p)| LabelScore {
                    label: name(i),
                    probability: p,
                })
                .collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.executor.stats()
    }

    /// Stop accepting requests and finish the queued ones
    pub fn close(&self) {
        self.executor.close();
    }

    /// Get health status
    pub fn health(&self) -> HealthResult {
        HealthResult {
            healthy: !self.executor.is_closed(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            backend: self.executor.backend_name().to_string(),
            labels: self.labels.clone(),
            queue_depth: self.executor.queue_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FnBackend;
    use crate::engine::BatchConfig;

    /// Scores "bye" texts as end of turn, everything else as continue
    fn keyword_classifier() -> Classifier {
        let executor = Executor::spawn_with_postprocess(
            BatchConfig::default(),
            || {
                Ok(FnBackend::new("keyword", |inputs: &[String]| {
                    Ok(inputs
                        .iter()
                        .map(|t| if t.contains("bye") { vec![0.0, 4.0] } else { vec![4.0, 0.0] })
                        .collect())
                }))
            },
            |logits: Vec<f32>| softmax(&logits),
        )
        .unwrap();
        Classifier::from_executor(executor, vec!["continue".into(), "end_of_turn".into()])
    }

    #[test]
    fn test_classify_names_best_label() {
        let classifier = keyword_classifier();

        let result = classifier.classify("ok bye").unwrap();
        assert_eq!(result.label, "end_of_turn");
        assert!(result.confidence > 0.9);
        assert_eq!(result.probabilities.len(), 2);
        let total: f32 = result.probabilities.iter().map(|s| s.probability).sum();
        assert!((total - 1.0).abs() < 1e-5);

        let result = classifier.classify("so I was thinking").unwrap();
        assert_eq!(result.label, "continue");
    }

    #[test]
    fn test_unnamed_classes_get_placeholder_labels() {
        let executor = Executor::spawn(BatchConfig::default(), || {
            Ok(FnBackend::new("three", |inputs: &[String]| {
                Ok(inputs.iter().map(|_| vec![0.1, 0.2, 0.7]).collect())
            }))
        })
        .unwrap();
        let classifier = Classifier::from_executor(executor, vec!["a".into()]);

        let result = classifier.classify("x").unwrap();
        assert_eq!(result.label, "class_2");
        assert_eq!(result.probabilities[0].label, "a");
    }

    #[test]
    fn test_start_with_default_config() {
        let classifier = Classifier::start(&Config::default()).unwrap();
        let result = classifier.classify("hello").unwrap();

        // Untrained weights give a uniform distribution
        for score in &result.probabilities {
            assert!((score.probability - 0.5).abs() < 1e-6);
        }

        let health = classifier.health();
        assert!(health.healthy);
        assert_eq!(health.backend, "linear");

        classifier.close();
        assert!(!classifier.health().healthy);
        assert!(matches!(classifier.classify("hello"), Err(ExecError::Closed)));
    }

    #[tokio::test]
    async fn test_classify_async() {
        let classifier = keyword_classifier();
        let result = classifier
            .classify_async("goodbye".to_string(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(result.label, "end_of_turn");
    }
}
