//! OpenVINO backend
//!
//! Runs a compiled OpenVINO classifier over the same hashed feature vectors
//! as the linear backend. The model is expected to take a `[batch, buckets]`
//! f32 tensor and produce `[batch, labels]` logits.
//!
//! The core and compiled model are created on the batch worker thread and
//! stay there, so no Send/Sync wrappers are needed.

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use openvino::{CompiledModel, Core, ElementType, Shape, Tensor};
use tracing::{debug, info};

use super::features::hash_features;
use super::Backend;

pub struct OpenVinoBackend {
    // Keep the core alive for as long as the compiled model
    _core: Core,
    compiled: CompiledModel,
    buckets: usize,
    num_labels: usize,
}

impl OpenVinoBackend {
    pub fn load(path: &Path, device: &str, buckets: usize, num_labels: usize) -> Result<Self> {
        if num_labels == 0 || buckets == 0 {
            bail!("OpenVINO backend needs at least one label and one feature bucket");
        }
        let path_str = path
            .to_str()
            .with_context(|| format!("model path is not valid UTF-8: {}", path.display()))?;

        info!("Loading OpenVINO model from {} on {}", path_str, device);
        let start = Instant::now();

        let mut core = Core::new()?;
        let model = core.read_model_from_file(path_str, "")?;
        let compiled = core.compile_model(&model, device.into())?;

        info!("OpenVINO model loaded in {:?}", start.elapsed());

        Ok(Self {
            _core: core,
            compiled,
            buckets,
            num_labels,
        })
    }
}

impl Backend for OpenVinoBackend {
    type Input = String;
    type Output = Vec<f32>;

    fn name(&self) -> &str {
        "openvino"
    }

    fn infer(&mut self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let input_data: Vec<f32> = inputs
            .iter()
            .flat_map(|text| hash_features(text, self.buckets))
            .collect();

        let mut request = self.compiled.create_infer_request()?;

        let input_shape = Shape::new(&[inputs.len() as i64, self.buckets as i64])?;
        let mut input = Tensor::new(ElementType::F32, &input_shape)?;
        unsafe {
            let tensor_data = input.get_raw_data_mut()?.as_mut_ptr() as *mut f32;
            std::ptr::copy_nonoverlapping(input_data.as_ptr(), tensor_data, input_data.len());
        }

        request.set_input_tensor(&input)?;
        request.infer()?;

        let output = request.get_output_tensor()?;
        let output_shape = output.get_shape()?;
        let output_len = output_shape.get_dimensions().iter().product::<i64>() as usize;

        let expected = inputs.len() * self.num_labels;
        if output_len != expected {
            bail!(
                "OpenVINO output has {} values, expected {} ({} x {} labels)",
                output_len,
                expected,
                inputs.len(),
                self.num_labels
            );
        }

        let output_data: Vec<f32> = unsafe {
            let ptr = output.get_raw_data()?.as_ptr() as *const f32;
            std::slice::from_raw_parts(ptr, output_len).to_vec()
        };
        debug!("OpenVINO logits for batch of {}: {:?}", inputs.len(), output_data);

        Ok(output_data
            .chunks_exact(self.num_labels)
            .map(|row| row.to_vec())
            .collect())
    }
}
