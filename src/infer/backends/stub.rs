//! Deterministic stub engine for development and tests.
//!
//! Scores are derived from the mean brightness of the packed features, so
//! the same frame always produces the same outcome and synthetic sources
//! exercise both result shapes without a real model.

use crate::features::FeatureBuffer;
use crate::infer::backend::{InferenceBackend, ModelCapability, ModelDescriptor};
use crate::infer::outcome::{BoundingBox, InferenceError, InferenceOutput, LabelScore};

pub struct StubBackend {
    descriptor: ModelDescriptor,
}

impl StubBackend {
    pub fn new(descriptor: ModelDescriptor) -> Self {
        Self { descriptor }
    }

    /// Mean of the decoded green channel, in 0..=1. Brightness proxy that is
    /// cheap and stable across runs.
    fn activation(features: &FeatureBuffer) -> f32 {
        if features.is_empty() {
            return 0.0;
        }
        let sum: f32 = features
            .as_slice()
            .iter()
            .map(|&v| (((v as u32) >> 8) & 0xFF) as f32)
            .sum();
        sum / (features.len() as f32 * 255.0)
    }
}

impl InferenceBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn run(&mut self, features: &FeatureBuffer) -> Result<InferenceOutput, InferenceError> {
        let activation = Self::activation(features);

        match self.descriptor.capability {
            ModelCapability::Classification => {
                // Spread the activation over the labels so exactly one class
                // dominates; the remainder share what is left.
                let labels = &self.descriptor.labels;
                let scores = labels
                    .iter()
                    .enumerate()
                    .map(|(ix, label)| {
                        let confidence = if ix == 0 {
                            1.0 - activation
                        } else {
                            activation / (labels.len().saturating_sub(1).max(1)) as f32
                        };
                        LabelScore {
                            label: label.clone(),
                            confidence,
                        }
                    })
                    .collect();
                Ok(InferenceOutput::Classification(scores))
            }
            ModelCapability::Detection => {
                let mut boxes = Vec::new();
                if activation > 0.25 {
                    let input = self.descriptor.input;
                    boxes.push(BoundingBox {
                        x: input.width / 4,
                        y: input.height / 4,
                        width: input.width / 2,
                        height: input.height / 2,
                        label: self
                            .descriptor
                            .labels
                            .first()
                            .cloned()
                            .unwrap_or_else(|| "object".to_string()),
                        confidence: activation,
                    });
                }
                Ok(InferenceOutput::Detection(boxes))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract_features;
    use crate::frame::Frame;
    use crate::preprocess::TargetSize;

    const TARGET: TargetSize = TargetSize {
        width: 8,
        height: 8,
    };

    fn descriptor(capability: ModelCapability) -> ModelDescriptor {
        ModelDescriptor {
            name: "stub-test".to_string(),
            capability,
            input: TARGET,
            labels: vec!["background".to_string(), "object".to_string()],
        }
    }

    fn features_for(frame: &Frame) -> FeatureBuffer {
        let mut buffer = FeatureBuffer::new(TARGET);
        extract_features(frame, &mut buffer).unwrap();
        buffer
    }

    #[test]
    fn dark_frames_classify_as_background() {
        let mut backend = StubBackend::new(descriptor(ModelCapability::Classification));
        let features = features_for(&Frame::black(8, 8));
        match backend.run(&features).unwrap() {
            InferenceOutput::Classification(scores) => {
                assert_eq!(scores[0].label, "background");
                assert!(scores[0].confidence > scores[1].confidence);
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn bright_frames_produce_a_detection() {
        let mut backend = StubBackend::new(descriptor(ModelCapability::Detection));
        let data = vec![200u8; 8 * 8 * 3];
        let frame = Frame::from_bgr(data, 8, 8).unwrap();
        match backend.run(&features_for(&frame)).unwrap() {
            InferenceOutput::Detection(boxes) => {
                assert_eq!(boxes.len(), 1);
                assert!(boxes[0].confidence > 0.25);
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn dark_frames_produce_no_detections() {
        let mut backend = StubBackend::new(descriptor(ModelCapability::Detection));
        let features = features_for(&Frame::black(8, 8));
        match backend.run(&features).unwrap() {
            InferenceOutput::Detection(boxes) => assert!(boxes.is_empty()),
            other => panic!("unexpected output {:?}", other),
        }
    }
}
