//! Adaptive compression under a byte budget.
//!
//! Walks a [`Ladder`] of (quality, scale) rungs from best to smallest. Each
//! rung is resized from the decoded source, watermarked for its own
//! dimensions and encoded; the first output at or under
//! `target_size_kb * 1024` bytes wins.
//!
//! ```text
//! rung 0  q40  ×1.00  ── 61 KB  too big
//! rung 1  q35  ×1.00  ── 52 KB  too big
//! rung 2  q30  ×1.00  ── 44 KB  ✓ returned, index 2
//! ```
//!
//! When nothing fits, the last rung that encoded at all is returned anyway
//! and flagged `within_budget = false`; a usable preview outranks the exact
//! byte target. A failing rung is logged and skipped. Only when every rung
//! fails does the engine give up.
//!
//! The engine knows nothing about fallback strategies. The
//! [facade](crate::preview) picks the plan and decides what to do on error.

use crate::config::ConfigError;
use crate::imaging::{
    BackendError, Dimensions, EncoderEffort, ImageBackend, OutputFormat, Quality, RenderParams,
    calculate_capped_dimensions, calculate_rung_dimensions,
};
use crate::watermark::{Watermark, WatermarkTier};
use image::DynamicImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Source could not be decoded: {0}")]
    Decode(#[source] BackendError),
    #[error("All {attempted} rungs failed; last error: {last}")]
    AllRungsFailed { attempted: usize, last: BackendError },
    #[error("Invalid processing config: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid ladder: {0}")]
    Ladder(#[from] LadderError),
}

#[derive(Error, Debug, PartialEq)]
pub enum LadderError {
    #[error("ladder has no rungs")]
    Empty,
    #[error("rung {index}: quality {quality} is outside 1-100")]
    QualityOutOfRange { index: usize, quality: u32 },
    #[error("rung {index}: quality rises above the previous rung")]
    QualityIncreases { index: usize },
    #[error("rung {index}: scale {scale} is outside (0, 1]")]
    ScaleOutOfRange { index: usize, scale: f32 },
    #[error("rung {index}: scale rises above the previous rung")]
    ScaleIncreases { index: usize },
}

/// Settings for one invocation.
///
/// Built by the facade from configured defaults plus caller overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingConfig {
    pub target_size_kb: u32,
    pub max_dimension: u32,
    pub watermark_text: String,
    /// Always false: previews never retain the original.
    pub store_original: bool,
}

impl ProcessingConfig {
    /// Budget in bytes. The pass check compares against this exactly.
    pub fn target_bytes(&self) -> u64 {
        self.target_size_kb as u64 * 1024
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_size_kb == 0 {
            return Err(ConfigError::Validation("target_size_kb must be positive".into()));
        }
        if self.max_dimension == 0 {
            return Err(ConfigError::Validation("max_dimension must be positive".into()));
        }
        if self.watermark_text.trim().is_empty() {
            return Err(ConfigError::Validation("watermark_text must not be empty".into()));
        }
        if self.store_original {
            return Err(ConfigError::Validation(
                "store_original is not supported for previews".into(),
            ));
        }
        Ok(())
    }
}

/// One step of the ladder. Written in config as `{ quality = 30, scale = 0.9 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rung {
    pub quality: Quality,
    /// Extra shrink applied to the capped longer edge, in `(0, 1]`.
    pub scale: f32,
}

impl Rung {
    pub fn new(quality: u32, scale: f32) -> Self {
        Self {
            quality: Quality::new(quality),
            scale,
        }
    }
}

/// Ordered rungs, best first. Quality and scale never increase.
#[derive(Debug, Clone, PartialEq)]
pub struct Ladder {
    rungs: Vec<Rung>,
}

impl Ladder {
    pub fn new(rungs: Vec<Rung>) -> Result<Self, LadderError> {
        if rungs.is_empty() {
            return Err(LadderError::Empty);
        }
        for (index, rung) in rungs.iter().enumerate() {
            let quality = rung.quality.value();
            if !(1..=100).contains(&quality) {
                return Err(LadderError::QualityOutOfRange { index, quality });
            }
            if !(rung.scale > 0.0 && rung.scale <= 1.0) {
                return Err(LadderError::ScaleOutOfRange {
                    index,
                    scale: rung.scale,
                });
            }
            if index == 0 {
                continue;
            }
            let prev = rungs[index - 1];
            if rung.quality > prev.quality {
                return Err(LadderError::QualityIncreases { index });
            }
            if rung.scale > prev.scale {
                return Err(LadderError::ScaleIncreases { index });
            }
        }
        Ok(Self { rungs })
    }

    /// Nine rungs, q40 down to q8; dimensions start shrinking at q25.
    pub fn full() -> Self {
        Self {
            rungs: vec![
                Rung::new(40, 1.0),
                Rung::new(35, 1.0),
                Rung::new(30, 1.0),
                Rung::new(25, 0.95),
                Rung::new(20, 0.9),
                Rung::new(15, 0.85),
                Rung::new(12, 0.8),
                Rung::new(10, 0.75),
                Rung::new(8, 0.7),
            ],
        }
    }

    /// Four coarse rungs for constrained runs.
    pub fn simplified() -> Self {
        Self {
            rungs: vec![
                Rung::new(30, 1.0),
                Rung::new(20, 0.9),
                Rung::new(12, 0.8),
                Rung::new(8, 0.7),
            ],
        }
    }

    /// A single full-scale rung at `quality`.
    pub fn fixed(quality: u32) -> Self {
        Self {
            rungs: vec![Rung::new(quality, 1.0)],
        }
    }

    pub fn rungs(&self) -> &[Rung] {
        &self.rungs
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }
}

/// How to render: overlay tier, ladder, resampling and encoder settings.
#[derive(Debug, Clone)]
pub struct CompressionPlan {
    pub tier: WatermarkTier,
    pub ladder: Ladder,
    pub filter: FilterType,
    pub effort: EncoderEffort,
    pub format: OutputFormat,
    pub deterrent_text: String,
    pub font_family: String,
}

/// Output of a successful ladder walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub buffer: Vec<u8>,
    pub dimensions: Dimensions,
    /// Index of the rung that produced `buffer`.
    pub rung_index: usize,
    pub quality: Quality,
    /// Encoded size rounded to whole KB.
    pub actual_size_kb: u32,
    /// False when no rung fit and the last encoded one was kept.
    pub within_budget: bool,
}

/// Encoded size rounded to the nearest whole KB.
pub fn size_kb(bytes: usize) -> u32 {
    (bytes as f64 / 1024.0).round() as u32
}

/// Decode `source` and walk the ladder.
pub fn compress<B: ImageBackend>(
    backend: &B,
    source: &[u8],
    config: &ProcessingConfig,
    plan: &CompressionPlan,
) -> Result<Compressed, CompressError> {
    config.validate()?;
    let image = backend.decode(source).map_err(CompressError::Decode)?;
    compress_image(backend, &image, config, plan)
}

/// Walk the ladder over an already-decoded image.
pub fn compress_image<B: ImageBackend>(
    backend: &B,
    image: &DynamicImage,
    config: &ProcessingConfig,
    plan: &CompressionPlan,
) -> Result<Compressed, CompressError> {
    config.validate()?;

    let original = (image.width(), image.height());
    let capped = calculate_capped_dimensions(original, config.max_dimension);
    let target = config.target_bytes();
    let watermark = Watermark::new(config.watermark_text.as_str())
        .deterrent(plan.deterrent_text.as_str())
        .font_family(plan.font_family.as_str());

    log::debug!(
        "compress: {}x{} → cap {}x{}, budget {} bytes, {} rungs ({:?} tier)",
        original.0,
        original.1,
        capped.0,
        capped.1,
        target,
        plan.ladder.len(),
        plan.tier
    );

    let mut best_effort: Option<Compressed> = None;
    let mut last_error: Option<BackendError> = None;

    for (index, rung) in plan.ladder.rungs().iter().enumerate() {
        let (width, height) = calculate_rung_dimensions(original, capped, rung.scale);
        let params = RenderParams {
            width,
            height,
            quality: rung.quality,
            format: plan.format,
            effort: plan.effort,
            filter: plan.filter,
            watermark_svg: watermark.compose(width, height, plan.tier),
        };

        let buffer = match backend.render(image, &params) {
            Ok(buffer) => buffer,
            Err(e) => {
                log::warn!(
                    "compress: rung {index} (q{}, {width}x{height}) failed: {e}",
                    rung.quality.value()
                );
                last_error = Some(e);
                continue;
            }
        };

        let len = buffer.len();
        let fits = len as u64 <= target;
        log::debug!(
            "compress: rung {index} q{} {width}x{height} → {len} bytes{}",
            rung.quality.value(),
            if fits { " (fits)" } else { "" }
        );

        let candidate = Compressed {
            buffer,
            dimensions: Dimensions::new(width, height),
            rung_index: index,
            quality: rung.quality,
            actual_size_kb: size_kb(len),
            within_budget: fits,
        };
        if fits {
            return Ok(candidate);
        }
        best_effort = Some(candidate);
    }

    match best_effort {
        Some(result) => {
            log::warn!(
                "compress: no rung within {} KB; keeping rung {} at {} KB",
                config.target_size_kb,
                result.rung_index,
                result.actual_size_kb
            );
            Ok(result)
        }
        None => Err(CompressError::AllRungsFailed {
            attempted: plan.ladder.len(),
            last: last_error.unwrap_or_else(|| BackendError::Encode("no rungs attempted".into())),
        }),
    }
}
