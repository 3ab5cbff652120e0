//! percept - single-camera perception pipeline.
//!
//! `perceptd` pulls frames from one video source, reduces each to the
//! model's input size, packs pixels into the engine's feature encoding,
//! runs inference, draws the result onto the frame, and republishes the
//! annotated frame over a live MJPEG feed, paced to a fixed frame interval.
//!
//! # Module structure
//!
//! - `capture`: video sources (synthetic stub, V4L2 behind `capture-v4l2`)
//! - `preprocess`: aspect-preserving resize + centered crop
//! - `features`: packed-RGB feature extraction
//! - `infer`: inference engine boundary and backends
//! - `render`: result interpretation and frame annotation
//! - `pacing`: fixed-interval cycle pacing
//! - `stream`: MJPEG republishing
//! - `pipeline`: the driver loop tying the stages together

pub mod capture;
pub mod config;
pub mod features;
pub mod frame;
pub mod infer;
pub mod pacing;
pub mod pipeline;
pub mod preprocess;
pub mod render;
pub mod stream;

pub use capture::{CameraConfig, CameraSource};
pub use config::{ModelSettings, PerceptConfig, StreamSettings};
pub use features::{extract_features, FeatureBuffer};
pub use frame::Frame;
pub use infer::{
    open_backend, BoundingBox, InferenceBackend, InferenceError, InferenceOutput, LabelScore,
    ModelCapability, ModelDescriptor, StubBackend,
};
pub use pacing::{CycleDeadline, PacingController};
pub use pipeline::Pipeline;
pub use preprocess::{crop_region, resize_and_crop, CropRegion, TargetSize};
pub use render::{render_result, RenderReport};
pub use stream::{FramePublisher, MjpegStreamer};
