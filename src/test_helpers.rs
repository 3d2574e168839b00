//! Shared test utilities: synthetic images and in-memory encodes.
//!
//! Nothing here touches the filesystem. Images are generated from simple
//! formulas so every test run sees the same pixels.

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;

// =========================================================================
// Synthetic images
// =========================================================================

/// Smooth RGB gradient. Compresses very well as PNG.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// Grayscale image whose pixels are pure black or white at random.
///
/// Roughly one bit of entropy per pixel, so it encodes small as PNG, but any
/// resampling produces intermediate grays.
pub fn binary_noise_image(width: u32, height: u32, seed: u64) -> DynamicImage {
    level_noise_image(width, height, 2, seed)
}

/// Grayscale noise drawn uniformly from `levels` evenly spaced grays.
///
/// Encoded density grows with `levels`, which lets tests pick a source at a
/// given bits-per-pixel.
pub fn level_noise_image(width: u32, height: u32, levels: u8, seed: u64) -> DynamicImage {
    let levels = u64::from(levels.max(2));
    let step = 255 / (levels - 1);
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |_, _| {
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        image::Luma([((state % levels) * step) as u8])
    }))
}

// =========================================================================
// Encoding
// =========================================================================

/// Encode with the `image` crate's default encoder for `format`.
pub fn encode_as(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format)
        .unwrap_or_else(|e| panic!("failed to encode test image as {format:?}: {e}"));
    out.into_inner()
}
