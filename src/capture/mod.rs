//! Video capture sources.
//!
//! A `CameraSource` delivers raw BGR frames, blocking until one is
//! available. Device selection:
//! - a bare integer `N` opens `/dev/videoN` (the numbering reported by
//!   `v4l2-ctl --list-devices`),
//! - an explicit path is opened verbatim,
//! - `stub://...` selects the synthetic source used in development and
//!   tests.
//!
//! Failure to open the source is fatal at startup; the pipeline never
//! retries capture configuration problems.

#[cfg(feature = "capture-v4l2")]
pub mod v4l2;

use anyhow::Result;
#[cfg(not(feature = "capture-v4l2"))]
use anyhow::anyhow;

use crate::frame::Frame;

/// Configuration for a capture source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device identifier: integer index, device path, or `stub://` URL.
    pub device: String,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
    /// Requested capture rate; the driver may refuse it.
    pub target_fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera".to_string(),
            width: 640,
            height: 480,
            target_fps: 10,
        }
    }
}

/// A single camera delivering BGR frames.
pub struct CameraSource {
    backend: Backend,
}

enum Backend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "capture-v4l2")]
    Device(v4l2::V4l2Camera),
}

impl CameraSource {
    /// Open the configured device.
    pub fn open(config: &CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            log::info!("camera: opened {} (synthetic)", config.device);
            return Ok(Self {
                backend: Backend::Synthetic(SyntheticCamera::new(config.clone())),
            });
        }
        Self::open_device(config)
    }

    #[cfg(feature = "capture-v4l2")]
    fn open_device(config: &CameraConfig) -> Result<Self> {
        let camera = v4l2::V4l2Camera::open(config)?;
        Ok(Self {
            backend: Backend::Device(camera),
        })
    }

    #[cfg(not(feature = "capture-v4l2"))]
    fn open_device(config: &CameraConfig) -> Result<Self> {
        Err(anyhow!(
            "cannot open device {}: perceptd was built without the capture-v4l2 feature",
            config.device
        ))
    }

    /// Capture resolution actually in effect.
    pub fn resolution(&self) -> (u32, u32) {
        match &self.backend {
            Backend::Synthetic(camera) => (camera.config.width, camera.config.height),
            #[cfg(feature = "capture-v4l2")]
            Backend::Device(camera) => camera.resolution(),
        }
    }

    /// Block until the next frame is available.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            Backend::Synthetic(camera) => camera.next_frame(),
            #[cfg(feature = "capture-v4l2")]
            Backend::Device(camera) => camera.next_frame(),
        }
    }

    /// Frames captured since the source was opened.
    pub fn frames_captured(&self) -> u64 {
        match &self.backend {
            Backend::Synthetic(camera) => camera.frame_count,
            #[cfg(feature = "capture-v4l2")]
            Backend::Device(camera) => camera.frames_captured(),
        }
    }
}

/// Resolve a device identifier into a device path.
pub(crate) fn device_path(device: &str) -> String {
    if device.chars().all(|c| c.is_ascii_digit()) && !device.is_empty() {
        format!("/dev/video{}", device)
    } else {
        device.to_string()
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for development and tests
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let width = self.config.width;
        let height = self.config.height;

        // Simple moving gradient so successive frames differ and the stub
        // engine sees varying activations.
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        let phase = (self.frame_count * 8) as u32;
        for y in 0..height {
            for x in 0..width {
                data.push(((x + phase) % 256) as u8);
                data.push(((y + phase) % 256) as u8);
                data.push(((x + y) % 256) as u8);
            }
        }
        Frame::from_bgr(data, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_source_produces_configured_dimensions() {
        let config = CameraConfig {
            device: "stub://test".to_string(),
            width: 320,
            height: 240,
            target_fps: 10,
        };
        let mut source = CameraSource::open(&config).expect("open");
        let frame = source.next_frame().expect("frame");
        assert_eq!(frame.width(), 320);
        assert_eq!(frame.height(), 240);
        assert_eq!(source.frames_captured(), 1);
    }

    #[test]
    fn synthetic_frames_vary_over_time() {
        let mut source = CameraSource::open(&CameraConfig::default()).expect("open");
        let first = source.next_frame().expect("frame");
        let second = source.next_frame().expect("frame");
        assert_ne!(first.as_bgr_bytes(), second.as_bgr_bytes());
    }

    #[test]
    fn numeric_identifiers_map_to_dev_video_nodes() {
        assert_eq!(device_path("0"), "/dev/video0");
        assert_eq!(device_path("12"), "/dev/video12");
        assert_eq!(device_path("/dev/video3"), "/dev/video3");
        assert_eq!(device_path("stub://x"), "stub://x");
    }
}
