//! Hashed linear classifier
//!
//! Pure-Rust backend: `logits = W · features(text) + b` over the hashed
//! bag-of-ngrams from [`super::features`].

use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::features::hash_features;
use super::Backend;

/// On-disk weight format (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearWeights {
    pub labels: Vec<String>,
    pub buckets: usize,
    /// One row of `buckets` weights per label
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

pub struct LinearBackend {
    weights: Array2<f32>,
    bias: Array1<f32>,
    buckets: usize,
}

impl LinearBackend {
    /// Untrained classifier: every input yields all-zero logits
    pub fn zeros(num_labels: usize, buckets: usize) -> Result<Self> {
        if num_labels == 0 || buckets == 0 {
            bail!("linear backend needs at least one label and one feature bucket");
        }
        Ok(Self {
            weights: Array2::zeros((num_labels, buckets)),
            bias: Array1::zeros(num_labels),
            buckets,
        })
    }

    pub fn from_weights(w: LinearWeights) -> Result<Self> {
        let rows = w.weights.len();
        if rows == 0 || w.buckets == 0 {
            bail!("linear weights are empty");
        }
        if rows != w.labels.len() || w.bias.len() != rows {
            bail!(
                "linear weights shape mismatch: {} labels, {} weight rows, {} biases",
                w.labels.len(),
                rows,
                w.bias.len()
            );
        }
        if let Some((i, row)) = w.weights.iter().enumerate().find(|(_, r)| r.len() != w.buckets) {
            bail!("weight row {} has {} columns, expected {}", i, row.len(), w.buckets);
        }

        let flat: Vec<f32> = w.weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((rows, w.buckets), flat)?;

        Ok(Self {
            weights,
            bias: Array1::from(w.bias),
            buckets: w.buckets,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading linear weights {}", path.display()))?;
        let weights: LinearWeights = serde_json::from_str(&content)
            .with_context(|| format!("parsing linear weights {}", path.display()))?;
        let backend = Self::from_weights(weights)?;
        info!(
            "Loaded linear weights from {} ({} labels x {} buckets)",
            path.display(),
            backend.num_labels(),
            backend.buckets
        );
        Ok(backend)
    }

    pub fn num_labels(&self) -> usize {
        self.weights.nrows()
    }
}

impl Backend for LinearBackend {
    type Input = String;
    type Output = Vec<f32>;

    fn name(&self) -> &str {
        "linear"
    }

    fn infer(&mut self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut x = Array2::<f32>::zeros((inputs.len(), self.buckets));
        for (mut row, text) in x.axis_iter_mut(Axis(0)).zip(inputs) {
            row.assign(&Array1::from(hash_features(text, self.buckets)));
        }

        // [batch, buckets] x [buckets, labels] -> [batch, labels]
        let logits = x.dot(&self.weights.t()) + &self.bias;

        Ok(logits.outer_iter().map(|row| row.to_vec()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::features::tokenize;
    use std::io::Write;

    #[test]
    fn test_zeros_gives_flat_logits() {
        let mut backend = LinearBackend::zeros(3, 16).unwrap();
        let out = backend.infer(&["a".to_string(), "b c".to_string()]).unwrap();
        assert_eq!(out, vec![vec![0.0; 3], vec![0.0; 3]]);
    }

    #[test]
    fn test_empty_batch_gives_empty_output() {
        let mut backend = LinearBackend::zeros(2, 8).unwrap();
        assert!(backend.infer(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_bias_and_weights_shift_logits() {
        // Weight every bucket toward label 1 so any non-empty text favours it
        let weights = LinearWeights {
            labels: vec!["continue".into(), "end".into()],
            buckets: 4,
            weights: vec![vec![0.0; 4], vec![1.0; 4]],
            bias: vec![0.5, 0.0],
        };
        let mut backend = LinearBackend::from_weights(weights).unwrap();

        let out = backend.infer(&["thanks, bye.".to_string(), String::new()]).unwrap();
        assert!(!tokenize("thanks, bye.").is_empty());
        assert!(out[0][1] > out[0][0]);
        // Empty text only sees the bias
        assert_eq!(out[1], vec![0.5, 0.0]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let weights = LinearWeights {
            labels: vec!["a".into(), "b".into()],
            buckets: 4,
            weights: vec![vec![0.0; 4], vec![0.0; 3]],
            bias: vec![0.0, 0.0],
        };
        assert!(LinearBackend::from_weights(weights).is_err());
    }

    #[test]
    fn test_load_from_json_file() {
        let weights = LinearWeights {
            labels: vec!["a".into(), "b".into(), "c".into()],
            buckets: 8,
            weights: vec![vec![0.1; 8]; 3],
            bias: vec![0.0; 3],
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&weights).unwrap().as_bytes())
            .unwrap();

        let backend = LinearBackend::load(file.path()).unwrap();
        assert_eq!(backend.num_labels(), 3);
    }
}
