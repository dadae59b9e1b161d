//! Pure Rust raster backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` with allocation limits |
//! | Resize | `DynamicImage::resize_exact` (filter chosen per strategy) |
//! | Watermark overlay | `usvg` parse → `resvg` render into a `tiny_skia::Pixmap` → premultiplied blend |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed from [`EncoderEffort`]) |
//! | Placeholder | procedurally filled canvas, same encoders |
//!
//! Text in the overlay is shaped with the fonts in the backend's `fontdb`
//! database. The database is built once per backend and shared read-only
//! by every render.

use super::backend::{BackendError, ImageBackend};
use super::params::{EncoderEffort, OutputFormat, PlaceholderParams, Quality, RenderParams};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader, Limits, Rgb, RgbImage};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Decoded-pixel ceiling used when none is configured (100 MP).
///
/// Roomy enough for 45-60 MP camera originals; `max_alloc` in the decode
/// limits is the hard memory bound.
pub const DEFAULT_MAX_DECODED_PIXELS: u64 = 100_000_000;

/// Neutral placeholder colours: background and stripe.
const PLACEHOLDER_BASE: Rgb<u8> = Rgb([0xD9, 0xD9, 0xD9]);
const PLACEHOLDER_STRIPE: Rgb<u8> = Rgb([0xC8, 0xC8, 0xC8]);
const PLACEHOLDER_STRIPE_PERIOD: u32 = 24;

/// Pure Rust backend using the `image` and `resvg` crates.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    fonts: Arc<usvg::fontdb::Database>,
    max_decoded_pixels: u64,
}

impl RustBackend {
    /// Backend with the system fonts loaded.
    pub fn new() -> Self {
        let mut fonts = usvg::fontdb::Database::new();
        fonts.load_system_fonts();
        Self::with_fonts(fonts)
    }

    /// Backend with system fonts plus every font found under `dirs`.
    pub fn with_font_dirs<P: AsRef<Path>>(dirs: &[P]) -> Self {
        let mut fonts = usvg::fontdb::Database::new();
        fonts.load_system_fonts();
        for dir in dirs {
            fonts.load_fonts_dir(dir);
        }
        Self::with_fonts(fonts)
    }

    pub fn with_fonts(fonts: usvg::fontdb::Database) -> Self {
        log::debug!("raster backend ready with {} font faces", fonts.len());
        Self {
            fonts: Arc::new(fonts),
            max_decoded_pixels: DEFAULT_MAX_DECODED_PIXELS,
        }
    }

    pub fn max_decoded_pixels(mut self, max: u64) -> Self {
        self.max_decoded_pixels = max;
        self
    }

    fn decode_limits(&self) -> Limits {
        let max_dim = self.max_decoded_pixels.min(u32::MAX as u64) as u32;
        let mut limits = Limits::default();
        limits.max_image_width = Some(max_dim);
        limits.max_image_height = Some(max_dim);
        limits.max_alloc = Some(self.max_decoded_pixels.saturating_mul(4));
        limits
    }

    /// Rasterise `svg` at the canvas size and blend it over `canvas`.
    fn composite(&self, canvas: &mut RgbImage, svg: &str) -> Result<(), BackendError> {
        if svg.is_empty() {
            return Ok(());
        }

        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fonts);
        let tree = usvg::Tree::from_str(svg, &options)
            .map_err(|e| BackendError::Overlay(format!("invalid overlay markup: {e}")))?;

        let (width, height) = canvas.dimensions();
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or(BackendError::InvalidDimensions { width, height })?;

        let size = tree.size();
        let transform = tiny_skia::Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        blend_premultiplied(canvas, pixmap.data());
        Ok(())
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Source-over blend of premultiplied RGBA8 onto opaque RGB8.
fn blend_premultiplied(canvas: &mut RgbImage, overlay: &[u8]) {
    for (dst, src) in canvas.pixels_mut().zip(overlay.chunks_exact(4)) {
        let alpha = src[3] as u32;
        if alpha == 0 {
            continue;
        }
        let inverse = 255 - alpha;
        for c in 0..3 {
            let blended = src[c] as u32 + (dst.0[c] as u32 * inverse + 127) / 255;
            dst.0[c] = blended.min(255) as u8;
        }
    }
}

/// Encode an RGB canvas in the requested format.
fn encode(
    canvas: &RgbImage,
    format: OutputFormat,
    quality: Quality,
    effort: EncoderEffort,
) -> Result<Vec<u8>, BackendError> {
    let (width, height) = canvas.dimensions();
    let quality = quality.value() as u8;
    let mut buffer = Vec::new();

    let result = match format {
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut buffer, quality).write_image(
            canvas.as_raw(),
            width,
            height,
            ExtendedColorType::Rgb8,
        ),
        OutputFormat::Avif => {
            AvifEncoder::new_with_speed_quality(&mut buffer, effort.avif_speed(), quality)
                .write_image(canvas.as_raw(), width, height, ExtendedColorType::Rgb8)
        }
    };
    result.map_err(|e| {
        BackendError::Encode(format!(
            "{} encode at q{quality} failed: {e}",
            format.extension()
        ))
    })?;

    if buffer.is_empty() {
        return Err(BackendError::Encode("encoder produced no bytes".to_string()));
    }
    Ok(buffer)
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        reader.limits(self.decode_limits());
        reader
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn render(&self, source: &DynamicImage, params: &RenderParams) -> Result<Vec<u8>, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::InvalidDimensions {
                width: params.width,
                height: params.height,
            });
        }

        let mut canvas = source
            .resize_exact(params.width, params.height, params.filter)
            .to_rgb8();
        self.composite(&mut canvas, &params.watermark_svg)?;
        encode(&canvas, params.format, params.quality, params.effort)
    }

    fn synthesize(&self, params: &PlaceholderParams) -> Result<Vec<u8>, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::InvalidDimensions {
                width: params.width,
                height: params.height,
            });
        }

        let canvas = RgbImage::from_fn(params.width, params.height, |x, y| {
            if (x + y) % PLACEHOLDER_STRIPE_PERIOD < PLACEHOLDER_STRIPE_PERIOD / 4 {
                PLACEHOLDER_STRIPE
            } else {
                PLACEHOLDER_BASE
            }
        });
        encode(
            &canvas,
            params.format,
            Quality::new(60),
            EncoderEffort::Reduced,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{encode_jpeg, encode_png, noisy_image};
    use image::imageops::FilterType;

    fn params(width: u32, height: u32, quality: u32, svg: &str) -> RenderParams {
        RenderParams {
            width,
            height,
            quality: Quality::new(quality),
            format: OutputFormat::Jpeg,
            effort: EncoderEffort::Standard,
            filter: FilterType::Triangle,
            watermark_svg: svg.to_string(),
        }
    }

    fn mean_luma(bytes: &[u8]) -> f64 {
        let img = image::load_from_memory(bytes).unwrap().to_luma8();
        let sum: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
        sum as f64 / (img.width() * img.height()) as f64
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let backend = RustBackend::new();
        let img = backend.decode(&encode_jpeg(200, 150)).unwrap();
        assert_eq!((img.width(), img.height()), (200, 150));
    }

    #[test]
    fn decode_synthetic_png() {
        let backend = RustBackend::new();
        let img = backend.decode(&encode_png(64, 64)).unwrap();
        assert_eq!((img.width(), img.height()), (64, 64));
    }

    #[test]
    fn decode_garbage_errors() {
        let backend = RustBackend::new();
        assert!(matches!(
            backend.decode(b"0123456789"),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn decode_respects_pixel_limit() {
        let backend = RustBackend::new().max_decoded_pixels(100);
        assert!(backend.decode(&encode_jpeg(200, 150)).is_err());
    }

    #[test]
    fn render_outputs_requested_dimensions() {
        let backend = RustBackend::new();
        let source = backend.decode(&encode_jpeg(400, 300)).unwrap();
        let out = backend.render(&source, &params(200, 150, 40, "")).unwrap();

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 150));
    }

    #[test]
    fn render_composites_overlay() {
        let backend = RustBackend::new();
        let black = DynamicImage::new_rgb8(100, 100);
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"><rect width="100" height="100" fill="white" fill-opacity="0.5"/></svg>"#;

        let plain = backend.render(&black, &params(100, 100, 90, "")).unwrap();
        let marked = backend.render(&black, &params(100, 100, 90, svg)).unwrap();

        assert!(mean_luma(&plain) < 10.0);
        assert!(mean_luma(&marked) > 100.0);
    }

    #[test]
    fn render_rejects_invalid_overlay() {
        let backend = RustBackend::new();
        let source = DynamicImage::new_rgb8(50, 50);
        let result = backend.render(&source, &params(50, 50, 40, "<svg"));
        assert!(matches!(result, Err(BackendError::Overlay(_))));
    }

    #[test]
    fn render_rejects_zero_dimensions() {
        let backend = RustBackend::new();
        let source = DynamicImage::new_rgb8(50, 50);
        assert!(matches!(
            backend.render(&source, &params(0, 50, 40, "")),
            Err(BackendError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn lower_quality_encodes_smaller() {
        let backend = RustBackend::new();
        let source = noisy_image(320, 240);
        let high = backend.render(&source, &params(320, 240, 40, "")).unwrap();
        let low = backend.render(&source, &params(320, 240, 8, "")).unwrap();
        assert!(high.len() >= low.len());
    }

    #[test]
    fn render_avif_output() {
        let backend = RustBackend::new();
        let source = DynamicImage::new_rgb8(32, 24);
        let out = backend
            .render(
                &source,
                &RenderParams {
                    format: OutputFormat::Avif,
                    effort: EncoderEffort::Reduced,
                    ..params(32, 24, 40, "")
                },
            )
            .unwrap();
        assert_eq!(&out[4..8], b"ftyp");
    }

    #[test]
    fn synthesize_placeholder_decodes() {
        let backend = RustBackend::new();
        let out = backend
            .synthesize(&PlaceholderParams {
                width: 400,
                height: 300,
                format: OutputFormat::Jpeg,
            })
            .unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 300));
    }

    #[test]
    fn synthesize_rejects_zero_size() {
        let backend = RustBackend::new();
        assert!(
            backend
                .synthesize(&PlaceholderParams {
                    width: 0,
                    height: 300,
                    format: OutputFormat::Jpeg,
                })
                .is_err()
        );
    }

    #[test]
    fn blend_skips_transparent_pixels() {
        let mut canvas = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
        // first pixel transparent, second opaque white
        blend_premultiplied(&mut canvas, &[0, 0, 0, 0, 255, 255, 255, 255]);
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([10, 20, 30]));
        assert_eq!(canvas.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }
}
