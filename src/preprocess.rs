//! Aspect-preserving resize and centered crop.
//!
//! Every captured frame is reduced to the model's input size in two steps:
//! a uniform resize by whichever scale factor makes the result at least as
//! large as the target on both axes, then a crop centered on the longer axis.
//! Aspect ratio is never squashed.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};

use crate::frame::Frame;

/// Spatial dimensions the inference engine requires. Loaded once at startup
/// from the model descriptor and immutable for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

/// The rectangle `resize_and_crop` extracts from the scaled image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Resize `input` uniformly so it covers the target on both axes, then crop
/// the centered `target.width x target.height` rectangle.
///
/// Precondition: `input` has nonzero dimensions. The pipeline rejects
/// malformed captures before calling in here.
pub fn resize_and_crop(input: &Frame, target: TargetSize) -> Frame {
    let (resized_w, resized_h, crop_x, crop_y) =
        scaled_geometry(input.width(), input.height(), target);

    // Channel order is irrelevant to interpolation, so the BGR bytes ride
    // through an Rgb buffer unchanged.
    let buffer =
        ImageBuffer::<Rgb<u8>, Vec<u8>>::from_vec(input.width(), input.height(), input.as_bgr_bytes().to_vec())
            .expect("frame length matches its dimensions");
    let resized = imageops::resize(&buffer, resized_w, resized_h, FilterType::Triangle);

    let mut out = Vec::with_capacity(target.width as usize * target.height as usize * 3);
    for y in 0..target.height {
        for x in 0..target.width {
            let px = resized.get_pixel(crop_x + x, crop_y + y);
            out.extend_from_slice(&px.0);
        }
    }
    Frame::from_bgr(out, target.width, target.height).expect("crop output matches target size")
}

/// The crop rectangle a given input/target pair produces. Used for debug
/// logging; `resize_and_crop` derives the same geometry.
pub fn crop_region(input_width: u32, input_height: u32, target: TargetSize) -> CropRegion {
    let (_, _, x, y) = scaled_geometry(input_width, input_height, target);
    CropRegion {
        x,
        y,
        width: target.width,
        height: target.height,
    }
}

/// Scaled dimensions plus crop offsets centering on whichever axis is
/// longer after scaling. Equal axes leave both offsets at zero.
fn scaled_geometry(input_width: u32, input_height: u32, target: TargetSize) -> (u32, u32, u32, u32) {
    let factor_w = target.width as f32 / input_width as f32;
    let factor_h = target.height as f32 / input_height as f32;
    let scale = if factor_w > factor_h { factor_w } else { factor_h };

    // The truncating cast can land one pixel short of the target when the
    // scale factor is not exactly representable; clamp so the crop always
    // fits inside the resized image.
    let resized_w = ((scale * input_width as f32) as u32).max(target.width);
    let resized_h = ((scale * input_height as f32) as u32).max(target.height);

    let (crop_x, crop_y) = if resized_w > resized_h {
        ((resized_w - resized_h) / 2, 0)
    } else if resized_h > resized_w {
        (0, (resized_h - resized_w) / 2)
    } else {
        (0, 0)
    };
    // For non-square targets the longer-axis centering can push the
    // rectangle past the scaled image; pull it back so it always fits.
    let crop_x = crop_x.min(resized_w - target.width);
    let crop_y = crop_y.min(resized_h - target.height);

    (resized_w, resized_h, crop_x, crop_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: TargetSize = TargetSize {
        width: 96,
        height: 96,
    };

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push((x % 256) as u8);
                data.push((y % 256) as u8);
                data.push(((x + y) % 256) as u8);
            }
        }
        Frame::from_bgr(data, width, height).unwrap()
    }

    #[test]
    fn landscape_input_crops_centered_along_width() {
        // 640x480 at scale 0.2 resizes to 128x96.
        let out = resize_and_crop(&gradient_frame(640, 480), TARGET);
        assert_eq!(out.width(), 96);
        assert_eq!(out.height(), 96);
        assert_eq!(
            crop_region(640, 480, TARGET),
            CropRegion {
                x: 16,
                y: 0,
                width: 96,
                height: 96
            }
        );
    }

    #[test]
    fn portrait_input_crops_centered_along_height() {
        let out = resize_and_crop(&gradient_frame(480, 640), TARGET);
        assert_eq!(out.width(), 96);
        assert_eq!(out.height(), 96);
        assert_eq!(
            crop_region(480, 640, TARGET),
            CropRegion {
                x: 0,
                y: 16,
                width: 96,
                height: 96
            }
        );
    }

    #[test]
    fn square_after_scaling_has_zero_offsets() {
        let region = crop_region(480, 480, TARGET);
        assert_eq!((region.x, region.y), (0, 0));
        let out = resize_and_crop(&gradient_frame(480, 480), TARGET);
        assert_eq!((out.width(), out.height()), (96, 96));
    }

    #[test]
    fn output_dimensions_match_target_for_odd_aspect_ratios() {
        for (w, h) in [(1280, 720), (720, 1280), (97, 101), (1920, 200)] {
            let out = resize_and_crop(&gradient_frame(w, h), TARGET);
            assert_eq!(
                (out.width(), out.height()),
                (96, 96),
                "input {}x{}",
                w,
                h
            );
        }
    }

    #[test]
    fn upscale_path_uses_the_same_logic() {
        // Smaller than the target on both axes forces scale > 1.
        let out = resize_and_crop(&gradient_frame(64, 48), TARGET);
        assert_eq!((out.width(), out.height()), (96, 96));
    }

    #[test]
    fn non_square_target_keeps_the_crop_inside_the_scaled_image() {
        // 1354x1000 into 128x96 scales to 129x96; the longer-axis centering
        // wants x=16 but only one spare column exists.
        let target = TargetSize {
            width: 128,
            height: 96,
        };
        let region = crop_region(1354, 1000, target);
        assert!(region.x <= 1);
        assert_eq!(region.y, 0);

        let out = resize_and_crop(&gradient_frame(1354, 1000), target);
        assert_eq!((out.width(), out.height()), (128, 96));
    }

    #[test]
    fn non_square_targets_fit_for_a_sweep_of_aspect_ratios() {
        for target in [
            TargetSize {
                width: 128,
                height: 96,
            },
            TargetSize {
                width: 96,
                height: 128,
            },
            TargetSize {
                width: 320,
                height: 240,
            },
        ] {
            for (w, h) in [(1354, 1000), (1000, 1354), (640, 480), (500, 500), (97, 101)] {
                let region = crop_region(w, h, target);
                let out = resize_and_crop(&gradient_frame(w, h), target);
                assert_eq!(
                    (out.width(), out.height()),
                    (target.width, target.height),
                    "input {}x{} target {}x{} region {:?}",
                    w,
                    h,
                    target.width,
                    target.height,
                    region
                );
            }
        }
    }
}
