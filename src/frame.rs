//! In-memory frame container.
//!
//! A `Frame` holds one captured image as tightly packed BGR24 bytes, the
//! native layout of the capture sources. Frames are owned by the pipeline
//! iteration that produced them and are never shared across iterations or
//! threads.

use anyhow::{anyhow, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb};

/// One captured image, 3 bytes per pixel in blue-green-red order.
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap raw BGR24 bytes. The byte length must match the dimensions.
    pub fn from_bgr(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "BGR frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Allocate a zeroed frame of the given dimensions.
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * 3],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw BGR bytes, row-major.
    pub fn as_bgr_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The `[b, g, r]` channels at `(x, y)`. Panics outside the frame;
    /// callers stay in bounds by construction.
    pub fn bgr(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * self.width + x) * 3) as usize;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Overwrite the pixel at `(x, y)`. Out-of-frame coordinates are ignored
    /// so overlay drawing can clip at the edges.
    pub fn put_bgr(&mut self, x: i64, y: i64, bgr: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 3) as usize;
        self.data[idx..idx + 3].copy_from_slice(&bgr);
    }

    /// Encode the frame as JPEG at the given quality (1..=100).
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut rgb = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(3) {
            rgb.push(px[2]);
            rgb.push(px[1]);
            rgb.push(px[0]);
        }
        let buffer = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_vec(self.width, self.height, rgb)
            .ok_or_else(|| anyhow!("frame does not fit an image buffer"))?;
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
            .encode_image(&buffer)
            .map_err(|err| anyhow!("JPEG encode failed: {}", err))?;
        Ok(jpeg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bgr_rejects_short_buffers() {
        assert!(Frame::from_bgr(vec![0u8; 11], 2, 2).is_err());
        assert!(Frame::from_bgr(vec![0u8; 12], 2, 2).is_ok());
    }

    #[test]
    fn from_bgr_rejects_overflowing_dimensions() {
        // u32::MAX^2 * 3 exceeds usize; the length check must fail cleanly
        // instead of wrapping.
        assert!(Frame::from_bgr(Vec::new(), u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn pixel_accessors_round_trip() {
        let mut frame = Frame::black(4, 3);
        frame.put_bgr(2, 1, [10, 20, 30]);
        assert_eq!(frame.bgr(2, 1), [10, 20, 30]);

        // Clipped writes are silently dropped.
        frame.put_bgr(-1, 0, [1, 1, 1]);
        frame.put_bgr(4, 0, [1, 1, 1]);
        assert_eq!(frame.bgr(0, 0), [0, 0, 0]);
        assert_eq!(frame.bgr(3, 0), [0, 0, 0]);
    }

    #[test]
    fn encode_jpeg_produces_a_jpeg_stream() {
        let frame = Frame::black(8, 8);
        let jpeg = frame.encode_jpeg(90).expect("encode");
        // JPEG SOI marker.
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
