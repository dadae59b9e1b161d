//! Shared test utilities for the proofmark test suite.
//!
//! Synthetic images only: nothing here reads fixtures from disk, so every
//! test is self-contained.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let upload = encode_jpeg(1200, 800);
//! let info = read_metadata(&upload);
//! assert_eq!((info.width, info.height), (1200, 800));
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

// =========================================================================
// Pixel sources
// =========================================================================

/// Smooth diagonal gradient. Compresses well.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    DynamicImage::ImageRgb8(img)
}

/// Deterministic pseudo-random noise. Compresses badly, so encoded size
/// tracks quality and dimensions closely.
pub fn noisy_image(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x9E37_79B9;
    let img = RgbImage::from_fn(width, height, |_, _| {
        // xorshift32
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    DynamicImage::ImageRgb8(img)
}

// =========================================================================
// Encoded uploads
// =========================================================================

/// A gradient JPEG upload at quality 90.
pub fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_image(width, height).to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, 90)
        .encode_image(&img)
        .unwrap();
    buffer
}

/// A noisy JPEG upload at quality 95. Large for its dimensions.
pub fn encode_noisy_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = noisy_image(width, height).to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, 95)
        .encode_image(&img)
        .unwrap();
    buffer
}

/// A gradient PNG upload.
pub fn encode_png(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    gradient_image(width, height)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

// =========================================================================
// Assertions
// =========================================================================

/// Decode `bytes` and return their pixel dimensions. Panics if undecodable.
pub fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes)
        .unwrap_or_else(|e| panic!("output is not a decodable image: {e}"));
    (img.width(), img.height())
}
