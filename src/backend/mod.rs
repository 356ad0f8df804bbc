//! Inference backends
//!
//! A backend runs one batched forward pass. Backends are constructed on the
//! batch worker thread and never leave it, so implementations do not need to
//! be `Send` or `Sync`.

pub mod features;
pub mod linear;
#[cfg(feature = "openvino")]
pub mod openvino;

use std::marker::PhantomData;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{InferenceConfig, ModelsConfig};

pub use linear::LinearBackend;

/// Batched inference over an ordered sequence of inputs.
///
/// On success the output has exactly one element per input, in input order.
/// Errors apply to the whole call.
pub trait Backend {
    type Input;
    type Output;

    /// Short identifier used in logs and health output
    fn name(&self) -> &str;

    fn infer(&mut self, inputs: &[Self::Input]) -> Result<Vec<Self::Output>>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    type Input = B::Input;
    type Output = B::Output;

    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn infer(&mut self, inputs: &[Self::Input]) -> Result<Vec<Self::Output>> {
        self.as_mut().infer(inputs)
    }
}

/// Text in, raw class logits out
pub type TextBackend = Box<dyn Backend<Input = String, Output = Vec<f32>>>;

/// Adapts a closure into a [`Backend`]
pub struct FnBackend<I, O, F> {
    name: String,
    f: F,
    _marker: PhantomData<fn(&[I]) -> Vec<O>>,
}

impl<I, O, F> FnBackend<I, O, F>
where
    F: FnMut(&[I]) -> Result<Vec<O>>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _marker: PhantomData,
        }
    }
}

impl<I, O, F> Backend for FnBackend<I, O, F>
where
    F: FnMut(&[I]) -> Result<Vec<O>>,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&mut self, inputs: &[I]) -> Result<Vec<O>> {
        (self.f)(inputs)
    }
}

/// Backend implementations selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Linear,
    #[serde(rename = "openvino")]
    OpenVino,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Linear => "linear",
            BackendKind::OpenVino => "openvino",
        }
    }
}

/// Build the configured backend, falling back to `fallback_backend` when the
/// preferred one cannot be loaded.
pub fn build(inference: &InferenceConfig, models: &ModelsConfig) -> Result<TextBackend> {
    match build_kind(inference.backend, inference, models) {
        Ok(backend) => Ok(backend),
        Err(e) => match inference.fallback_backend {
            Some(fallback) if fallback != inference.backend => {
                warn!(
                    "Backend {} unavailable ({:#}), falling back to {}",
                    inference.backend.as_str(),
                    e,
                    fallback.as_str()
                );
                build_kind(fallback, inference, models)
                    .with_context(|| format!("fallback backend {} failed", fallback.as_str()))
            }
            _ => Err(e),
        },
    }
}

fn build_kind(kind: BackendKind, inference: &InferenceConfig, models: &ModelsConfig) -> Result<TextBackend> {
    info!("Loading {} backend", kind.as_str());
    match kind {
        BackendKind::Linear => {
            let backend = match &models.linear_weights {
                Some(path) => LinearBackend::load(path)?,
                None => {
                    info!("No linear weights configured, using an untrained classifier");
                    LinearBackend::zeros(models.labels.len(), models.feature_buckets)?
                }
            };
            if backend.num_labels() != models.labels.len() {
                bail!(
                    "linear weights have {} labels but {} are configured",
                    backend.num_labels(),
                    models.labels.len()
                );
            }
            Ok(Box::new(backend))
        }
        BackendKind::OpenVino => build_openvino(inference, models),
    }
}

#[cfg(feature = "openvino")]
fn build_openvino(inference: &InferenceConfig, models: &ModelsConfig) -> Result<TextBackend> {
    let path = models
        .openvino_model
        .as_ref()
        .context("models.openvino_model is not set")?;
    let backend = self::openvino::OpenVinoBackend::load(
        path,
        &inference.device,
        models.feature_buckets,
        models.labels.len(),
    )?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "openvino"))]
fn build_openvino(_inference: &InferenceConfig, _models: &ModelsConfig) -> Result<TextBackend> {
    bail!("built without OpenVINO support (enable the `openvino` feature)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_backend_kind_from_config_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: BackendKind,
        }
        let w: Wrapper = toml::from_str("kind = \"openvino\"").unwrap();
        assert_eq!(w.kind, BackendKind::OpenVino);
        let w: Wrapper = toml::from_str("kind = \"linear\"").unwrap();
        assert_eq!(w.kind, BackendKind::Linear);
    }

    #[test]
    fn test_build_default_linear() {
        let config = Config::default();
        let mut backend = build(&config.inference, &config.models).unwrap();
        assert_eq!(backend.name(), "linear");

        let logits = backend.infer(&["hello there".to_string()]).unwrap();
        assert_eq!(logits.len(), 1);
        assert_eq!(logits[0].len(), config.models.labels.len());
    }

    #[cfg(not(feature = "openvino"))]
    #[test]
    fn test_openvino_falls_back_to_linear() {
        let mut config = Config::default();
        config.inference.backend = BackendKind::OpenVino;
        config.inference.fallback_backend = Some(BackendKind::Linear);

        let backend = build(&config.inference, &config.models).unwrap();
        assert_eq!(backend.name(), "linear");
    }

    #[cfg(not(feature = "openvino"))]
    #[test]
    fn test_no_fallback_propagates_error() {
        let mut config = Config::default();
        config.inference.backend = BackendKind::OpenVino;
        config.inference.fallback_backend = None;

        assert!(build(&config.inference, &config.models).is_err());
    }
}
