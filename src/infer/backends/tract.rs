#![cfg(feature = "backend-tract")]

//! ONNX classification backend built on tract.
//!
//! The packed feature values are decoded back into per-channel planes and
//! fed to the model as a normalized NCHW tensor. Output scores map onto the
//! descriptor's labels in order.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::features::FeatureBuffer;
use crate::infer::backend::{InferenceBackend, ModelCapability, ModelDescriptor};
use crate::infer::outcome::{InferenceError, InferenceOutput, LabelScore};

pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    descriptor: ModelDescriptor,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn load<P: AsRef<Path>>(model_path: P, descriptor: ModelDescriptor) -> Result<Self> {
        if descriptor.capability != ModelCapability::Classification {
            return Err(anyhow!(
                "the tract backend only serves classification models"
            ));
        }
        let model_path = model_path.as_ref();
        let input = descriptor.input;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input.height as usize, input.width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, descriptor })
    }

    fn build_input(&self, features: &FeatureBuffer) -> Result<Tensor, InferenceError> {
        let input = self.descriptor.input;
        let width = input.width as usize;
        let height = input.height as usize;
        if features.len() != width * height {
            return Err(InferenceError::new(
                2,
                format!(
                    "feature buffer length {} does not match model input {}x{}",
                    features.len(),
                    input.width,
                    input.height
                ),
            ));
        }

        let values = features.as_slice();
        let tensor =
            tract_ndarray::Array4::from_shape_fn((1, 3, height, width), |(_, channel, y, x)| {
                let packed = values[y * width + x] as u32;
                let byte = match channel {
                    0 => (packed >> 16) & 0xFF,
                    1 => (packed >> 8) & 0xFF,
                    _ => packed & 0xFF,
                };
                byte as f32 / 255.0
            });
        Ok(tensor.into_tensor())
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn run(&mut self, features: &FeatureBuffer) -> Result<InferenceOutput, InferenceError> {
        let input = self.build_input(features)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|err| InferenceError::new(1, format!("ONNX inference failed: {}", err)))?;
        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::new(1, "model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .map_err(|err| InferenceError::new(1, format!("model output was not f32: {}", err)))?;

        let labeled = self
            .descriptor
            .labels
            .iter()
            .zip(scores.iter())
            .map(|(label, &confidence)| LabelScore {
                label: label.clone(),
                confidence,
            })
            .collect();
        Ok(InferenceOutput::Classification(labeled))
    }
}
