//! Parameter types for image operations.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between the [compression engine](crate::compress) (which decides the
//! dimensions, quality and overlay of every ladder rung) and the
//! [backend](super::backend) (which does the pixel work). Keeping them plain
//! data lets tests drive the engine with a recording mock backend.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`OutputFormat`]: Encoded preview format (JPEG or AVIF).
//! - [`EncoderEffort`]: How much CPU the encoder may spend per image.
//! - [`RenderParams`]: One rung: target size, quality, resampling filter, overlay.
//! - [`PlaceholderParams`]: A synthesized neutral canvas.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(40)
    }
}

/// Encoded format of a generated preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Avif,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Avif => "image/avif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Avif => "avif",
        }
    }
}

/// Encoder CPU budget.
///
/// Only AVIF exposes a speed knob; the JPEG encoder ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderEffort {
    Standard,
    Reduced,
}

impl EncoderEffort {
    /// rav1e speed preset (1 = slowest/best, 10 = fastest).
    pub fn avif_speed(self) -> u8 {
        match self {
            Self::Standard => 6,
            Self::Reduced => 10,
        }
    }
}

/// Parameters for rendering one candidate preview.
///
/// `watermark_svg` is composited over the resized canvas before encoding;
/// its declared size must equal `width` x `height`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub format: OutputFormat,
    pub effort: EncoderEffort,
    pub filter: FilterType,
    pub watermark_svg: String,
}

/// Parameters for a synthesized placeholder image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderParams {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_orders_by_value() {
        assert!(Quality::new(40) > Quality::new(8));
    }

    #[test]
    fn reduced_effort_is_faster_avif_preset() {
        assert!(EncoderEffort::Reduced.avif_speed() > EncoderEffort::Standard.avif_speed());
    }

    #[test]
    fn output_format_parses_lowercase() {
        let f: OutputFormat = serde_json::from_str("\"avif\"").unwrap();
        assert_eq!(f, OutputFormat::Avif);
        assert_eq!(f.mime_type(), "image/avif");
        assert_eq!(OutputFormat::default().extension(), "jpg");
    }
}
