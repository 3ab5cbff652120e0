//! V4L2 device backend.
//!
//! Opens a local device node, negotiates a BGR3 format at the configured
//! geometry, and memory-maps a small capture queue. Refused format or rate
//! requests fall back to whatever the driver reports, with a logged warning.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::{device_path, CameraConfig};
use crate::frame::Frame;

pub struct V4l2Camera {
    state: CameraState,
    active_width: u32,
    active_height: u32,
    frame_count: u64,
}

#[self_referencing]
struct CameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Camera {
    pub fn open(config: &CameraConfig) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let path = device_path(&config.device);
        let mut device =
            v4l::Device::with_path(&path).with_context(|| format!("open v4l2 device {}", path))?;

        let mut format = device.format().context("read v4l2 format")?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"BGR3");
        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("camera: failed to set format on {}: {}", path, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        if format.fourcc != v4l::FourCC::new(b"BGR3") {
            return Err(anyhow!(
                "device {} does not deliver BGR3 (active format {})",
                path,
                format.fourcc
            ));
        }

        if config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("camera: failed to set fps on {}: {}", path, err);
            }
        }

        let state = CameraStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "camera: opened {} ({}x{})",
            path,
            format.width,
            format.height
        );
        Ok(Self {
            state,
            active_width: format.width,
            active_height: format.height,
            frame_count: 0,
        })
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.active_width, self.active_height)
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let (width, height) = (self.active_width, self.active_height);
        let data = self
            .state
            .with_mut(|fields| fields.stream.next().map(|(buf, _meta)| buf.to_vec()))
            .map_err(|err| anyhow::Error::new(err).context("capture v4l2 frame"))?;
        self.frame_count += 1;
        Frame::from_bgr(data, width, height)
    }
}
