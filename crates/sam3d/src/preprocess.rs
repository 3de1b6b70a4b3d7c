//! Deterministic image transforms applied before submission to the service
//!
//! The reconstruction endpoint expects a fixed 256x256 input; this is a hard
//! contract with the service's GPU memory budget, not a tunable.

use crate::types::{Result, Sam3dError};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use std::io::Cursor;

/// Fixed input dimension expected by the reconstruction service
pub const TARGET_SIZE: u32 = 256;

/// Resize an encoded image to exactly `width` x `height` and re-encode as PNG
///
/// Uses Lanczos3 resampling for quality. Fails with [`Sam3dError::DecodeError`]
/// if the input bytes are not a decodable image.
pub fn resize_image(bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Sam3dError::DecodeError(format!("invalid source image: {}", e)))?;

    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    encode_png(&resized)
}

/// Synthesize a fully-opaque single-color mask marking the entire image as
/// foreground
///
/// Deterministic for a given size; the service treats value 255 as "object".
pub fn build_full_select_mask(width: u32, height: u32) -> Vec<u8> {
    let mask = GrayImage::from_pixel(width, height, Luma([255u8]));
    encode_png(&DynamicImage::ImageLuma8(mask))
        .expect("in-memory PNG encode of a uniform mask cannot fail")
}

/// Synthesize a centered elliptical mask covering `coverage` of each dimension
///
/// Kept for callers that frame their own subject; the pipeline default is
/// [`build_full_select_mask`].
pub fn build_elliptical_mask(width: u32, height: u32, coverage: f32) -> Vec<u8> {
    let coverage = coverage.clamp(0.0, 1.0);
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let rx = (width as f32 * coverage / 2.0).max(1.0);
    let ry = (height as f32 * coverage / 2.0).max(1.0);

    let mask = GrayImage::from_fn(width, height, |x, y| {
        let dx = (x as f32 + 0.5 - cx) / rx;
        let dy = (y as f32 + 0.5 - cy) / ry;
        if dx * dx + dy * dy <= 1.0 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    encode_png(&DynamicImage::ImageLuma8(mask))
        .expect("in-memory PNG encode of a mask cannot fail")
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| Sam3dError::DecodeError(format!("PNG encode failed: {}", e)))?;
    Ok(buf.into_inner())
}
