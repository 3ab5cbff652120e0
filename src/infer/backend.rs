use crate::features::FeatureBuffer;
use crate::infer::outcome::{InferenceError, InferenceOutput};
use crate::preprocess::TargetSize;

/// What shape of result a model produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelCapability {
    Classification,
    Detection,
}

/// Static properties of the loaded model, resolved once at startup.
#[derive(Clone, Debug)]
pub struct ModelDescriptor {
    pub name: String,
    pub capability: ModelCapability,
    pub input: TargetSize,
    /// Class labels in model output order.
    pub labels: Vec<String>,
}

/// Inference engine trait.
///
/// Implementations receive the packed feature buffer (see
/// `features::extract_features` for the encoding contract) and return one
/// outcome per call. A nonzero engine code surfaces as `InferenceError` and
/// stops the pipeline.
pub trait InferenceBackend: Send {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// The model's static capability descriptor.
    fn descriptor(&self) -> &ModelDescriptor;

    /// Run the model over one frame's features.
    fn run(&mut self, features: &FeatureBuffer) -> Result<InferenceOutput, InferenceError>;

    /// Optional warm-up hook, called once before the first cycle.
    fn warm_up(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
