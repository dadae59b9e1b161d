//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the preview
//! pipeline needs from a raster engine: decode an upload, render one ladder
//! rung (resize + watermark overlay + encode), and synthesize a neutral
//! placeholder image.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked. Tests drive the compression engine and facade with the recording
//! [`MockBackend`](tests::MockBackend) instead, so ladder and fallback logic
//! is checked without encoding real pixels.

use super::params::{PlaceholderParams, RenderParams};
use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Watermark overlay failed: {0}")]
    Overlay(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Trait for raster backends.
///
/// Implementations must be `Sync`: one backend is shared by every concurrent
/// invocation of the [`PreviewProcessor`](crate::preview::PreviewProcessor).
pub trait ImageBackend: Sync {
    /// Decode raw upload bytes into pixels.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Resize `source` to the requested size, composite the watermark overlay
    /// and encode. Returns the encoded bytes.
    fn render(&self, source: &DynamicImage, params: &RenderParams) -> Result<Vec<u8>, BackendError>;

    /// Encode a small neutral image without touching any upload.
    fn synthesize(&self, params: &PlaceholderParams) -> Result<Vec<u8>, BackendError>;
}
