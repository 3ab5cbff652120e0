//! Inference engine boundary.
//!
//! The pipeline treats model execution as an external collaborator: it hands
//! a packed feature buffer to an `InferenceBackend` and receives either a
//! label/score list (classifiers) or a bounding-box list (detectors). The
//! backend's capability descriptor is resolved once at startup; result
//! interpretation dispatches on it every cycle.

pub mod backend;
pub mod backends;
pub mod outcome;

use anyhow::Result;
#[cfg(not(feature = "backend-tract"))]
use anyhow::anyhow;

use crate::config::ModelSettings;

pub use backend::{InferenceBackend, ModelCapability, ModelDescriptor};
pub use backends::stub::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::tract::TractBackend;
pub use outcome::{BoundingBox, InferenceError, InferenceOutput, LabelScore};

/// Instantiate the configured backend. A model path selects the ONNX
/// backend; otherwise the deterministic stub runs.
pub fn open_backend(settings: &ModelSettings) -> Result<Box<dyn InferenceBackend>> {
    match &settings.model_path {
        None => Ok(Box::new(StubBackend::new(settings.descriptor()))),
        #[cfg(feature = "backend-tract")]
        Some(path) => Ok(Box::new(TractBackend::load(path, settings.descriptor())?)),
        #[cfg(not(feature = "backend-tract"))]
        Some(path) => Err(anyhow!(
            "model path {} configured but perceptd was built without the backend-tract feature",
            path.display()
        )),
    }
}
