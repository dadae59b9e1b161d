//! SVG watermark overlays.
//!
//! The composer only produces markup; the raster backend composites it over
//! each candidate canvas. Two tiers exist:
//!
//! - **Dense**: a text tile pattern rotated -35° covering the whole canvas
//!   (cropping any region still leaves marks), a large centered deterrent
//!   label and small brand labels in two corners. Each tile also carries a
//!   hairline stroke, so the pattern survives even when no font can be found.
//! - **Simple**: three static text elements (center, bottom-right, top-left).
//!   Used when rendering cost must stay low.
//!
//! Both tiers use the same -35° rotation for the central mark and keep every
//! opacity within 0.35–0.5, so a preview from either tier reads as coming
//! from the same studio.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Rotation of the tile pattern and the central mark, in degrees.
pub const ROTATION_DEGREES: i32 = -35;

/// Deterrent phrase used when none is configured.
pub const DEFAULT_DETERRENT: &str = "PROOF - NOT FOR REPRODUCTION";

/// Font family list used when none is configured.
pub const DEFAULT_FONT_FAMILY: &str = "DejaVu Sans, Liberation Sans, Arial, Helvetica, sans-serif";

/// Average glyph advance as a fraction of the font size, used to size tiles.
const GLYPH_ADVANCE: f64 = 0.6;

/// Visual fidelity of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkTier {
    Dense,
    Simple,
}

impl WatermarkTier {
    fn min_font_size(self) -> u32 {
        match self {
            Self::Dense => 14,
            Self::Simple => 16,
        }
    }

    fn density_divisor(self) -> u32 {
        match self {
            Self::Dense => 12,
            Self::Simple => 10,
        }
    }

    fn base_opacity(self) -> f32 {
        match self {
            Self::Dense => 0.35,
            Self::Simple => 0.4,
        }
    }
}

/// Derived sizing for one overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkSpec {
    pub font_size: u32,
    pub opacity: f32,
    /// Distance between tile rows.
    pub tile_spacing: u32,
    /// Width of one tile (fits the text plus padding).
    pub tile_width: u32,
}

impl WatermarkSpec {
    /// Compute sizing for a `width` x `height` canvas carrying `text`.
    pub fn for_canvas(width: u32, height: u32, text: &str, tier: WatermarkTier) -> Self {
        let font_size = (width.min(height) / tier.density_divisor()).max(tier.min_font_size());
        let chars = text.chars().count().max(6) as f64;
        let tile_width = (chars * GLYPH_ADVANCE * font_size as f64 + 2.0 * font_size as f64).ceil();

        Self {
            font_size,
            opacity: tier.base_opacity(),
            tile_spacing: font_size * 4,
            tile_width: tile_width as u32,
        }
    }
}

/// Text content and typography of an overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    /// Brand string repeated in the tiles and corners.
    pub text: String,
    /// Stronger phrase shown large in the center.
    pub deterrent: String,
    pub font_family: String,
}

impl Watermark {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            deterrent: DEFAULT_DETERRENT.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }

    pub fn deterrent(mut self, deterrent: impl Into<String>) -> Self {
        self.deterrent = deterrent.into();
        self
    }

    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    /// Compose overlay markup for a `width` x `height` canvas.
    pub fn compose(&self, width: u32, height: u32, tier: WatermarkTier) -> String {
        let spec = WatermarkSpec::for_canvas(width, height, &self.text, tier);
        let mut svg = String::with_capacity(2048);
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );

        if tier == WatermarkTier::Dense {
            self.push_tile_pattern(&mut svg, width, height, &spec);
        }
        self.push_center_mark(&mut svg, width, height, &spec, tier);
        self.push_corner_marks(&mut svg, width, height, &spec);

        svg.push_str("</svg>");
        svg
    }

    fn push_tile_pattern(&self, svg: &mut String, width: u32, height: u32, spec: &WatermarkSpec) {
        let fs = spec.font_size;
        let tw = spec.tile_width;
        let th = spec.tile_spacing;
        let hairline = (fs as f64 / 12.0).max(1.5);
        let _ = write!(
            svg,
            concat!(
                r##"<defs><pattern id="proofmark-tile" patternUnits="userSpaceOnUse" width="{tw}" height="{th}" patternTransform="rotate({rot})">"##,
                r##"<text x="{pad}" y="{baseline}" font-family="{family}" font-size="{fs}" font-weight="700" fill="#ffffff" fill-opacity="{op}" stroke="#000000" stroke-opacity="0.35" stroke-width="1">{text}</text>"##,
                r##"<line x1="0" y1="{th}" x2="{tw}" y2="{th}" stroke="#ffffff" stroke-opacity="0.5" stroke-width="{hairline:.1}"/>"##,
                r##"</pattern></defs>"##,
                r##"<rect x="0" y="0" width="{width}" height="{height}" fill="url(#proofmark-tile)"/>"##,
            ),
            tw = tw,
            th = th,
            rot = ROTATION_DEGREES,
            pad = fs,
            baseline = th / 2,
            family = escape_xml(&self.font_family),
            fs = fs,
            op = spec.opacity,
            text = escape_xml(&self.text),
            hairline = hairline,
            width = width,
            height = height,
        );
    }

    fn push_center_mark(
        &self,
        svg: &mut String,
        width: u32,
        height: u32,
        spec: &WatermarkSpec,
        tier: WatermarkTier,
    ) {
        let cx = width as f64 / 2.0;
        let cy = height as f64 / 2.0;
        let diagonal = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt();
        let chars = self.deterrent.chars().count().max(1) as f64;
        let grow = match tier {
            WatermarkTier::Dense => 2.2,
            WatermarkTier::Simple => 2.0,
        };
        // Large, but never longer than most of the diagonal it is drawn along.
        let size = (spec.font_size as f64 * grow)
            .min(diagonal * 0.8 / (chars * GLYPH_ADVANCE))
            .max(spec.font_size as f64 * 0.75);

        let _ = write!(
            svg,
            r##"<text x="{cx:.1}" y="{cy:.1}" text-anchor="middle" dominant-baseline="central" transform="rotate({rot} {cx:.1} {cy:.1})" font-family="{family}" font-size="{size:.1}" font-weight="700" fill="#ffffff" fill-opacity="0.5" stroke="#000000" stroke-opacity="0.4" stroke-width="{stroke:.1}">{text}</text>"##,
            rot = ROTATION_DEGREES,
            family = escape_xml(&self.font_family),
            stroke = (size / 24.0).max(1.0),
            text = escape_xml(&self.deterrent),
        );
    }

    fn push_corner_marks(&self, svg: &mut String, width: u32, height: u32, spec: &WatermarkSpec) {
        let size = (spec.font_size as f64 * 0.9).max(10.0);
        let margin = (size * 0.8).round();
        let family = escape_xml(&self.font_family);
        let text = escape_xml(&self.text);

        // top-left
        let _ = write!(
            svg,
            r##"<text x="{margin}" y="{top:.1}" font-family="{family}" font-size="{size:.1}" fill="#ffffff" fill-opacity="0.45" stroke="#000000" stroke-opacity="0.35" stroke-width="1">{text}</text>"##,
            top = margin + size,
        );
        // bottom-right
        let _ = write!(
            svg,
            r##"<text x="{right:.1}" y="{bottom:.1}" text-anchor="end" font-family="{family}" font-size="{size:.1}" fill="#ffffff" fill-opacity="0.45" stroke="#000000" stroke-opacity="0.35" stroke-width="1">{text}</text>"##,
            right = width as f64 - margin,
            bottom = height as f64 - margin,
        );
    }
}

/// Compose an overlay with the default deterrent phrase and fonts.
pub fn compose_watermark(width: u32, height: u32, text: &str, tier: WatermarkTier) -> String {
    Watermark::new(text).compose(width, height, tier)
}

/// Escape text for use in SVG character data and attribute values.
pub fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
