use std::fmt;

/// One label with its confidence, as reported by a classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub confidence: f32,
}

/// One candidate bounding box, as reported by a detector.
///
/// Coordinates are pixels in the model's input space. A box whose confidence
/// is exactly 0 marks an empty candidate slot, not a real detection.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub label: String,
    pub confidence: f32,
}

/// What the engine produced for one frame. The variant is fixed by the
/// model's capability; it never changes between cycles.
#[derive(Clone, Debug)]
pub enum InferenceOutput {
    Classification(Vec<LabelScore>),
    Detection(Vec<BoundingBox>),
}

/// Nonzero engine error code. Fatal for the whole process: a single failed
/// cycle is assumed to indicate a systemic engine problem, so there is no
/// retry and no graceful degradation.
#[derive(Clone, Debug)]
pub struct InferenceError {
    pub code: i32,
    pub message: String,
}

impl InferenceError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inference engine error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for InferenceError {}
