//! End-to-end preview scenarios against the real raster backend.
//!
//! Run with: cargo test --test preview_pipeline

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use proofmark::config::{ExecutionProfile, PreviewConfig};
use proofmark::imaging::{self, RustBackend};
use proofmark::preview::{FALLBACK_LEVEL_INDEX, PreviewOptions, PreviewProcessor, Strategy};
use proofmark::storage::analyze_storage_requirements;
use proptest::prelude::*;
use std::io::Cursor;
use std::sync::OnceLock;

// =========================================================================
// Fixtures
// =========================================================================

/// Dark gradient so the white watermark stands out.
fn dark_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 40 / width) as u8,
            (y * 40 / height) as u8,
            20,
        ])
    })
}

fn jpeg_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, 90)
        .encode_image(img)
        .unwrap();
    buffer
}

fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

fn processor() -> &'static PreviewProcessor<RustBackend> {
    static PROCESSOR: OnceLock<PreviewProcessor<RustBackend>> = OnceLock::new();
    PROCESSOR.get_or_init(|| PreviewProcessor::new(PreviewConfig::default()))
}

fn decode(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory(bytes).expect("preview must decode")
}

fn max_luma(img: &DynamicImage) -> u8 {
    img.to_luma8().pixels().map(|p| p.0[0]).max().unwrap_or(0)
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn large_jpeg_fits_budget_with_watermark() {
    let upload = jpeg_bytes(&dark_image(3000, 2000));
    let options = PreviewOptions::default()
        .max_dimension(500)
        .target_size_kb(35)
        .watermark_text("Lakeview Studio");

    let result = processor().process_for_preview(&upload, &options).unwrap();

    assert_eq!(result.strategy, Strategy::Full);
    let (w, h) = (result.final_dimensions.width, result.final_dimensions.height);
    assert!(w.max(h) <= 500);
    assert!(result.within_budget);
    assert!(result.buffer.len() <= 35 * 1024);
    assert!(result.actual_size_kb <= 35);

    let preview = decode(&result.buffer);
    assert_eq!((preview.width(), preview.height()), (w, h));
    // Source never exceeds luma ~40; anything bright is the overlay.
    assert!(max_luma(&preview) > 80, "watermark not visible");
}

#[test]
fn garbage_input_yields_placeholder() {
    let garbage = b"0123456789";
    let info = imaging::read_metadata(garbage);
    assert_eq!((info.width, info.height), (800, 600));
    assert_eq!(info.format.as_str(), "unknown");

    let result = processor()
        .process_for_preview(garbage, &PreviewOptions::default())
        .unwrap();

    assert_eq!(result.strategy, Strategy::Placeholder);
    assert_eq!(result.compression_level_index, FALLBACK_LEVEL_INDEX);
    let placeholder = decode(&result.buffer);
    assert_eq!((placeholder.width(), placeholder.height()), (400, 300));
}

#[test]
fn placeholder_is_capped_like_any_preview() {
    let result = processor()
        .process_for_preview(b"0123456789", &PreviewOptions::default().max_dimension(120))
        .unwrap();

    assert_eq!(result.strategy, Strategy::Placeholder);
    let placeholder = decode(&result.buffer);
    assert_eq!((placeholder.width(), placeholder.height()), (120, 90));
}

#[test]
fn placeholder_never_upscales_truncated_upload() {
    let upload = png_bytes(&dark_image(64, 48));
    let truncated = &upload[..40];
    assert_eq!(imaging::read_metadata(truncated).width, 64);

    let result = processor()
        .process_for_preview(truncated, &PreviewOptions::default())
        .unwrap();

    assert_eq!(result.strategy, Strategy::Placeholder);
    let placeholder = decode(&result.buffer);
    assert_eq!((placeholder.width(), placeholder.height()), (64, 48));
}

#[test]
fn season_within_one_gigabyte() {
    let analysis = analyze_storage_requirements(1000 * 20, 35);
    assert!((analysis.total_estimated_gb - 0.667).abs() < 0.001);
    assert!(analysis.within_ceiling);
}

#[test]
fn season_over_one_gigabyte() {
    let analysis = analyze_storage_requirements(1000 * 20, 60);
    assert!((analysis.total_estimated_gb - 1.14).abs() < 0.01);
    assert!(!analysis.within_ceiling);
    let suggested = analysis.suggested_per_item_kb.unwrap();
    assert!(suggested <= 52);
    assert!(analyze_storage_requirements(20_000, suggested).within_ceiling);
}

#[test]
fn small_square_png_is_not_upscaled() {
    let upload = png_bytes(&dark_image(400, 400));
    let result = processor()
        .process_for_preview(&upload, &PreviewOptions::default().max_dimension(800))
        .unwrap();

    let dims = result.final_dimensions;
    assert_eq!(dims.width, dims.height);
    assert!(dims.width <= 400);
    if result.compression_level_index < 3 {
        assert_eq!((dims.width, dims.height), (400, 400));
    }
}

// =========================================================================
// Properties
// =========================================================================

#[test]
fn aspect_ratio_preserved_within_one_pixel() {
    for (w, h) in [(1601, 997), (997, 1601), (1200, 1200)] {
        let upload = jpeg_bytes(&dark_image(w, h));
        let result = processor()
            .process_for_preview(&upload, &PreviewOptions::default().max_dimension(640))
            .unwrap();
        let out = result.final_dimensions;
        assert!(out.width <= w && out.height <= h, "upscaled {w}x{h}");
        if w >= h {
            let exact = out.width as f64 * h as f64 / w as f64;
            assert!((out.height as f64 - exact).abs() <= 1.0);
        } else {
            let exact = out.height as f64 * w as f64 / h as f64;
            assert!((out.width as f64 - exact).abs() <= 1.0);
        }
    }
}

#[test]
fn constrained_profile_uses_simplified_strategy() {
    let mut config = PreviewConfig::default();
    config.pipeline.profile = ExecutionProfile::Constrained;
    let constrained = PreviewProcessor::new(config);

    let upload = jpeg_bytes(&dark_image(900, 600));
    let result = constrained
        .process_for_preview(&upload, &PreviewOptions::default())
        .unwrap();

    assert_eq!(result.strategy, Strategy::Simplified);
    let preview = decode(&result.buffer);
    assert_eq!((preview.width(), preview.height()), (900, 600));
}

#[test]
fn variants_follow_breakpoints() {
    let upload = jpeg_bytes(&dark_image(1000, 750));
    let variants = processor()
        .generate_multi_resolution_variants(&upload, "Lakeview Studio")
        .unwrap();

    let sizes: Vec<(u32, u32)> = variants.iter().map(|v| (v.width, v.height)).collect();
    assert_eq!(sizes, vec![(300, 225), (800, 600)]);
    for variant in &variants {
        let img = decode(&variant.buffer);
        assert_eq!((img.width(), img.height()), (variant.width, variant.height));
    }
}

#[test]
fn concurrent_invocations_share_one_processor() {
    let upload = jpeg_bytes(&dark_image(800, 600));
    let options = PreviewOptions::default().max_dimension(300);

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| processor().process_for_preview(&upload, &options)))
            .collect();
        for handle in handles {
            let result = handle.join().unwrap().unwrap();
            assert_eq!(result.strategy, Strategy::Full);
            assert_eq!(result.final_dimensions.width, 300);
        }
    });
}

#[test]
fn truncated_jpeg_never_returns_empty_buffer() {
    let upload = jpeg_bytes(&dark_image(640, 480));
    let truncated = &upload[..upload.len() / 3];
    let result = processor()
        .process_for_preview(truncated, &PreviewOptions::default())
        .unwrap();
    assert!(!result.buffer.is_empty());
    assert!(result.final_dimensions.width > 0 && result.final_dimensions.height > 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn arbitrary_bytes_never_produce_malformed_output(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let result = processor()
            .process_for_preview(&bytes, &PreviewOptions::default())
            .unwrap();
        prop_assert!(!result.buffer.is_empty());
        prop_assert!(result.final_dimensions.width > 0);
        prop_assert!(result.final_dimensions.height > 0);
    }

    #[test]
    fn metadata_defaults_are_idempotent(
        bytes in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        prop_assert_eq!(imaging::read_metadata(&bytes), imaging::read_metadata(&bytes));
    }
}
