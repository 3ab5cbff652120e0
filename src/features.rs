//! Pixel-to-feature packing.
//!
//! The inference engines consume a flat buffer of one f32 per pixel, each
//! value the packed 24-bit color `(r << 16) | (g << 8) | b`. This is a
//! lossless integer encoding carried in float form, not a normalized color;
//! the engine's input decoder unpacks the channels itself. Any deviation in
//! packing or traversal order silently corrupts every inference.

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::preprocess::TargetSize;

/// Reusable flat feature buffer of length `width * height`.
///
/// The pipeline loop owns one of these for its whole lifetime and overwrites
/// it in full every cycle; reuse is purely an allocation optimization and
/// carries no semantics across cycles.
pub struct FeatureBuffer {
    values: Vec<f32>,
    target: TargetSize,
}

impl FeatureBuffer {
    pub fn new(target: TargetSize) -> Self {
        Self {
            values: vec![0.0; target.width as usize * target.height as usize],
            target,
        }
    }

    pub fn target(&self) -> TargetSize {
        self.target
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// Pack `frame` into `out`, row-major, one entry per pixel with no gaps.
///
/// The frame must already have the buffer's target dimensions; a mismatch is
/// an error rather than a silent corruption.
pub fn extract_features(frame: &Frame, out: &mut FeatureBuffer) -> Result<()> {
    if frame.width() != out.target.width || frame.height() != out.target.height {
        return Err(anyhow!(
            "frame size {}x{} does not match feature buffer target {}x{}",
            frame.width(),
            frame.height(),
            out.target.width,
            out.target.height
        ));
    }

    let mut ix = 0usize;
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let [b, g, r] = frame.bgr(x, y);
            out.values[ix] = (((r as u32) << 16) | ((g as u32) << 8) | b as u32) as f32;
            ix += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: TargetSize = TargetSize {
        width: 4,
        height: 3,
    };

    fn patterned_frame() -> Frame {
        let mut data = Vec::new();
        for y in 0..TARGET.height {
            for x in 0..TARGET.width {
                // b, g, r
                data.push((x * 10) as u8);
                data.push((y * 10) as u8);
                data.push((x + y) as u8);
            }
        }
        Frame::from_bgr(data, TARGET.width, TARGET.height).unwrap()
    }

    #[test]
    fn buffer_length_is_width_times_height() {
        let buffer = FeatureBuffer::new(TARGET);
        assert_eq!(buffer.len(), 12);
    }

    #[test]
    fn packed_values_decode_back_to_source_channels() {
        let frame = patterned_frame();
        let mut buffer = FeatureBuffer::new(TARGET);
        extract_features(&frame, &mut buffer).expect("extract");

        for y in 0..TARGET.height {
            for x in 0..TARGET.width {
                let v = buffer.as_slice()[(y * TARGET.width + x) as usize] as u32;
                let [b, g, r] = frame.bgr(x, y);
                assert_eq!(((v >> 16) & 0xFF) as u8, r);
                assert_eq!(((v >> 8) & 0xFF) as u8, g);
                assert_eq!((v & 0xFF) as u8, b);
            }
        }
    }

    #[test]
    fn full_white_packs_losslessly() {
        // 0xFFFFFF = 16_777_215 is exactly representable in f32.
        let data = vec![255u8; (TARGET.width * TARGET.height * 3) as usize];
        let frame = Frame::from_bgr(data, TARGET.width, TARGET.height).unwrap();
        let mut buffer = FeatureBuffer::new(TARGET);
        extract_features(&frame, &mut buffer).unwrap();
        assert!(buffer.as_slice().iter().all(|&v| v == 16_777_215.0));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let frame = Frame::black(5, 5);
        let mut buffer = FeatureBuffer::new(TARGET);
        assert!(extract_features(&frame, &mut buffer).is_err());
    }

    #[test]
    fn buffer_is_fully_overwritten_on_reuse() {
        let mut buffer = FeatureBuffer::new(TARGET);
        let white = Frame::from_bgr(
            vec![255u8; (TARGET.width * TARGET.height * 3) as usize],
            TARGET.width,
            TARGET.height,
        )
        .unwrap();
        extract_features(&white, &mut buffer).unwrap();
        extract_features(&Frame::black(TARGET.width, TARGET.height), &mut buffer).unwrap();
        assert!(buffer.as_slice().iter().all(|&v| v == 0.0));
    }
}
