//! Header-only image identification.
//!
//! Reads width, height and container format straight from the first bytes of
//! an upload, without decoding any pixels. Recognises:
//!
//! | Format | Signature | Dimensions |
//! |---|---|---|
//! | JPEG | `FF D8` | SOF0–SOF3 segment: height, width as big-endian u16 |
//! | PNG | `89 50 4E 47` | IHDR: width/height as big-endian u32 at offsets 16/20 |
//! | WebP | `RIFF....WEBP` | `VP8 ` / `VP8L` / `VP8X` chunk headers |
//!
//! This is best-effort inference, not validation. Upstream upload checks own
//! acceptance; anything unparseable here yields [`ImageInfo::fallback`].

use serde::Serialize;

pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
pub const PNG_SIGNATURE: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

const FALLBACK_WIDTH: u32 = 800;
const FALLBACK_HEIGHT: u32 = 600;

/// Container format inferred from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Unknown,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Unknown => "unknown",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Dimensions and format of a raw upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl ImageInfo {
    /// The safe default returned for anything we cannot parse: 800x600, unknown.
    pub const fn fallback() -> Self {
        Self {
            width: FALLBACK_WIDTH,
            height: FALLBACK_HEIGHT,
            format: ImageFormat::Unknown,
        }
    }

    pub fn is_recognised(&self) -> bool {
        self.format != ImageFormat::Unknown
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Identify an image from its leading bytes.
///
/// Never fails: unknown signatures, truncated headers and zero dimensions all
/// return [`ImageInfo::fallback`].
pub fn read_metadata(data: &[u8]) -> ImageInfo {
    let parsed = if data.starts_with(&JPEG_SOI) {
        jpeg_dimensions(data).map(|d| (d, ImageFormat::Jpeg))
    } else if data.starts_with(&PNG_SIGNATURE) {
        png_dimensions(data).map(|d| (d, ImageFormat::Png))
    } else if is_webp(data) {
        webp_dimensions(data).map(|d| (d, ImageFormat::WebP))
    } else {
        None
    };

    match parsed {
        Some(((width, height), format)) if width > 0 && height > 0 => ImageInfo {
            width,
            height,
            format,
        },
        _ => ImageInfo::fallback(),
    }
}

// ---------------------------------------------------------------------------
// JPEG: walk marker segments to the first baseline/progressive SOF
// ---------------------------------------------------------------------------

fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut pos = 2;

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            return None;
        }

        let marker = data[pos + 1];
        match marker {
            // Fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // Standalone markers carry no length field
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // SOS / EOI before any SOF: no frame header to read
            0xD9 | 0xDA => return None,
            0xC0..=0xC3 => {
                if pos + 8 >= data.len() {
                    return None;
                }
                let height = u16::from_be_bytes([data[pos + 5], data[pos + 6]]);
                let width = u16::from_be_bytes([data[pos + 7], data[pos + 8]]);
                return Some((width as u32, height as u32));
            }
            _ => {}
        }

        if pos + 3 >= data.len() {
            return None;
        }
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 {
            return None;
        }
        pos += 2 + seg_len;
    }

    None
}

// ---------------------------------------------------------------------------
// PNG: IHDR is always the first chunk
// ---------------------------------------------------------------------------

fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 24 || &data[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Some((width, height))
}

// ---------------------------------------------------------------------------
// WebP: RIFF container with a VP8 / VP8L / VP8X first chunk
// ---------------------------------------------------------------------------

fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

fn webp_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let chunk = find_subslice(&data[12..], b"VP8").map(|i| i + 12)?;
    let kind = *data.get(chunk + 3)?;

    match kind {
        // Lossy: frame tag (3) + start code (3), then 14-bit LE width/height
        b' ' => {
            let bytes = data.get(chunk + 14..chunk + 18)?;
            let width = u16::from_le_bytes([bytes[0], bytes[1]]) & 0x3FFF;
            let height = u16::from_le_bytes([bytes[2], bytes[3]]) & 0x3FFF;
            Some((width as u32, height as u32))
        }
        // Lossless: signature 0x2F, then 14 bits width-1, 14 bits height-1
        b'L' => {
            if *data.get(chunk + 8)? != 0x2F {
                return None;
            }
            let b = data.get(chunk + 9..chunk + 13)?;
            let bits = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            let width = (bits & 0x3FFF) + 1;
            let height = ((bits >> 14) & 0x3FFF) + 1;
            Some((width, height))
        }
        // Extended: 24-bit canvas width-1 / height-1 after 4 flag bytes
        b'X' => {
            let b = data.get(chunk + 12..chunk + 18)?;
            let width = u32::from_le_bytes([b[0], b[1], b[2], 0]) + 1;
            let height = u32::from_le_bytes([b[3], b[4], b[5], 0]) + 1;
            Some((width, height))
        }
        _ => None,
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{encode_jpeg, encode_png};

    #[test]
    fn reads_synthetic_jpeg() {
        let bytes = encode_jpeg(320, 200);
        assert_eq!(
            read_metadata(&bytes),
            ImageInfo {
                width: 320,
                height: 200,
                format: ImageFormat::Jpeg
            }
        );
    }

    #[test]
    fn reads_synthetic_png() {
        let bytes = encode_png(400, 400);
        let info = read_metadata(&bytes);
        assert_eq!((info.width, info.height), (400, 400));
        assert_eq!(info.format, ImageFormat::Png);
    }

    #[test]
    fn skips_app_segments_before_sof() {
        // SOI, APP0 (len 16), SOF0 with height=0x0100, width=0x0200
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        bytes.extend_from_slice(&[0u8; 14]);
        bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x01, 0x00, 0x02, 0x00]);
        let info = read_metadata(&bytes);
        assert_eq!((info.width, info.height), (512, 256));
    }

    #[test]
    fn reads_lossy_webp_header() {
        let mut bytes = b"RIFF\0\0\0\0WEBPVP8 ".to_vec();
        bytes.extend_from_slice(&[0u8; 4]); // chunk size
        bytes.extend_from_slice(&[0x10, 0x02, 0x00]); // frame tag
        bytes.extend_from_slice(&[0x9D, 0x01, 0x2A]); // start code
        bytes.extend_from_slice(&640u16.to_le_bytes());
        bytes.extend_from_slice(&(480u16 | 0x4000).to_le_bytes()); // scale bits masked off
        let info = read_metadata(&bytes);
        assert_eq!(
            info,
            ImageInfo {
                width: 640,
                height: 480,
                format: ImageFormat::WebP
            }
        );
    }

    #[test]
    fn reads_lossless_webp_header() {
        let bits: u32 = (100 - 1) | ((50 - 1) << 14);
        let mut bytes = b"RIFF\0\0\0\0WEBPVP8L".to_vec();
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.push(0x2F);
        bytes.extend_from_slice(&bits.to_le_bytes());
        let info = read_metadata(&bytes);
        assert_eq!((info.width, info.height), (100, 50));
    }

    #[test]
    fn reads_extended_webp_header() {
        let mut bytes = b"RIFF\0\0\0\0WEBPVP8X".to_vec();
        bytes.extend_from_slice(&[0u8; 4]); // chunk size
        bytes.extend_from_slice(&[0u8; 4]); // flags + reserved
        bytes.extend_from_slice(&[0x1F, 0x03, 0x00]); // 799 → 800
        bytes.extend_from_slice(&[0x57, 0x02, 0x00]); // 599 → 600
        let info = read_metadata(&bytes);
        assert_eq!((info.width, info.height), (800, 600));
        assert_eq!(info.format, ImageFormat::WebP);
    }

    #[test]
    fn garbage_returns_fallback() {
        assert_eq!(read_metadata(b"not-image!"), ImageInfo::fallback());
        assert_eq!(read_metadata(&[]), ImageInfo::fallback());
    }

    #[test]
    fn truncated_headers_return_fallback() {
        assert_eq!(read_metadata(&[0xFF, 0xD8, 0xFF]), ImageInfo::fallback());
        assert_eq!(read_metadata(&PNG_SIGNATURE), ImageInfo::fallback());
        assert_eq!(read_metadata(b"RIFF\0\0\0\0WEBP"), ImageInfo::fallback());
    }

    #[test]
    fn zero_dimensions_return_fallback() {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&10u32.to_be_bytes());
        assert_eq!(read_metadata(&bytes), ImageInfo::fallback());
    }

    #[test]
    fn fallback_is_idempotent() {
        let corrupt = [0xFFu8, 0xD8, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let first = read_metadata(&corrupt);
        let second = read_metadata(&corrupt);
        assert_eq!(first, second);
        assert_eq!(first, ImageInfo::fallback());
        assert_eq!(first.format.as_str(), "unknown");
    }
}
