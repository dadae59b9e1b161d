//! Progressive-loading side products.
//!
//! Two optional enrichments a client can paint before the preview arrives:
//!
//! - `blur_data_url`: the image shrunk to fit 10x10, blurred, JPEG-encoded
//!   and embedded as `data:image/jpeg;base64,...`.
//! - `avg_color`: the image averaged down to one pixel, as `rgb(r, g, b)`.
//!
//! Neither may hold up the preview itself, so failures only log at debug.

use crate::imaging::{ImageBackend, fit_inside};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::Serialize;

/// Bounding box of the blurred thumbnail.
pub const BLUR_BOX: (u32, u32) = (10, 10);
const BLUR_SIGMA: f32 = 1.0;
const BLUR_QUALITY: u8 = 70;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Placeholders {
    pub blur_data_url: Option<String>,
    pub avg_color: Option<String>,
}

/// Compute both placeholders from decoded pixels.
pub fn generate_placeholders(image: &DynamicImage) -> Placeholders {
    Placeholders {
        blur_data_url: blur_data_url(image),
        avg_color: average_color(image),
    }
}

/// Decode `bytes` with `backend`, then compute placeholders.
///
/// An undecodable buffer yields empty placeholders.
pub fn generate_placeholders_from_bytes<B: ImageBackend>(backend: &B, bytes: &[u8]) -> Placeholders {
    match backend.decode(bytes) {
        Ok(image) => generate_placeholders(&image),
        Err(e) => {
            log::debug!("placeholders skipped: {e}");
            Placeholders::default()
        }
    }
}

fn blur_data_url(image: &DynamicImage) -> Option<String> {
    if image.width() == 0 || image.height() == 0 {
        return None;
    }
    let (width, height) = fit_inside((image.width(), image.height()), BLUR_BOX);
    let tiny = image
        .resize_exact(width, height, FilterType::Triangle)
        .blur(BLUR_SIGMA)
        .to_rgb8();

    let mut jpeg = Vec::new();
    if let Err(e) = JpegEncoder::new_with_quality(&mut jpeg, BLUR_QUALITY).encode_image(&tiny) {
        log::debug!("blur placeholder encode failed: {e}");
        return None;
    }
    Some(format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)))
}

fn average_color(image: &DynamicImage) -> Option<String> {
    if image.width() == 0 || image.height() == 0 {
        return None;
    }
    let pixel = image.thumbnail_exact(1, 1).to_rgb8();
    let [r, g, b] = pixel.get_pixel(0, 0).0;
    Some(format!("rgb({r}, {g}, {b})"))
}
