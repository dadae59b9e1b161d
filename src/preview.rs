//! The preview facade: one upload in, one watermarked preview out.
//!
//! [`PreviewProcessor::process_for_preview`] runs a strictly one-way
//! degradation chain. Each strategy is tried at most once:
//!
//! ```text
//!   Full ──error──▶ Simplified ──error──▶ Placeholder ──error──▶ PreviewError
//!    │                  │                     │
//!    dense overlay      simple overlay        no transforms:
//!    9-rung ladder      4-rung ladder         synthesize a neutral image
//!    Lanczos3           Triangle              (or pass the upload through,
//!    standard effort    reduced effort         if configured)
//! ```
//!
//! The [`ExecutionProfile`] chooses the entry point: `Constrained` hosts
//! skip straight to Simplified. Every transition is logged with the state
//! entered and a one-line error summary.
//!
//! Uploads whose header claims more than `pipeline.max_source_pixels` never
//! reach the decoder; they go straight to the placeholder.

use crate::compress::{
    CompressError, CompressionPlan, Ladder, LadderError, ProcessingConfig, compress_image,
};
use crate::config::{ConfigError, ExecutionProfile, PlaceholderPolicy, PreviewConfig};
use crate::imaging::{
    Dimensions, EncoderEffort, ImageBackend, ImageInfo, PlaceholderParams, RustBackend,
    calculate_responsive_sizes, fit_inside, fit_longest_edge, read_metadata,
};
use crate::placeholder::{Placeholders, generate_placeholders};
use crate::watermark::WatermarkTier;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// `compression_level_index` of a result no ladder produced.
pub const FALLBACK_LEVEL_INDEX: i32 = -1;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Invalid preview options: {0}")]
    InvalidOptions(#[from] ConfigError),
    #[error("No preview could be produced: {last}")]
    Exhausted { last: String },
    #[error("Source too large: {pixels} pixels exceeds limit of {limit}")]
    SourceTooLarge { pixels: u64, limit: u64 },
    #[error("Variant {target}px failed: {source}")]
    Variant {
        target: u32,
        #[source]
        source: CompressError,
    },
    #[error(transparent)]
    Compress(#[from] CompressError),
}

/// Per-call overrides. Unset fields take the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewOptions {
    pub target_size_kb: Option<u32>,
    pub max_dimension: Option<u32>,
    pub watermark_text: Option<String>,
}

impl PreviewOptions {
    pub fn target_size_kb(mut self, kb: u32) -> Self {
        self.target_size_kb = Some(kb);
        self
    }

    pub fn max_dimension(mut self, px: u32) -> Self {
        self.max_dimension = Some(px);
        self
    }

    pub fn watermark_text(mut self, text: impl Into<String>) -> Self {
        self.watermark_text = Some(text.into());
        self
    }
}

/// Which facade state produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Full,
    Simplified,
    Placeholder,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Simplified => "simplified",
            Self::Placeholder => "placeholder",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedResult {
    #[serde(skip)]
    pub buffer: Vec<u8>,
    pub final_dimensions: Dimensions,
    /// Winning ladder rung, or [`FALLBACK_LEVEL_INDEX`].
    pub compression_level_index: i32,
    pub actual_size_kb: u32,
    pub blur_data_url: Option<String>,
    pub avg_color: Option<String>,
    pub strategy: Strategy,
    /// MIME type of `buffer`.
    pub format: &'static str,
    pub within_budget: bool,
}

/// One fixed-breakpoint rendition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewVariant {
    /// Requested longer edge.
    pub target: u32,
    pub width: u32,
    pub height: u32,
    pub actual_size_kb: u32,
    #[serde(skip)]
    pub buffer: Vec<u8>,
}

/// Entry point for preview generation.
///
/// Holds only immutable state, so one processor can serve many threads.
pub struct PreviewProcessor<B: ImageBackend = RustBackend> {
    backend: B,
    config: PreviewConfig,
}

impl PreviewProcessor<RustBackend> {
    /// Processor backed by [`RustBackend`] with system fonts, decode limits
    /// taken from `config`.
    pub fn new(config: PreviewConfig) -> Self {
        let backend = RustBackend::new().max_decoded_pixels(config.pipeline.max_source_pixels);
        Self::with_backend(backend, config)
    }
}

impl<B: ImageBackend> PreviewProcessor<B> {
    pub fn with_backend(backend: B, config: PreviewConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Merge `options` over the configured defaults and validate.
    pub fn processing_config(&self, options: &PreviewOptions) -> Result<ProcessingConfig, PreviewError> {
        let defaults = &self.config.preview;
        let config = ProcessingConfig {
            target_size_kb: options.target_size_kb.unwrap_or(defaults.target_size_kb),
            max_dimension: options.max_dimension.unwrap_or(defaults.max_dimension),
            watermark_text: options
                .watermark_text
                .clone()
                .unwrap_or_else(|| defaults.watermark_text.clone()),
            store_original: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Produce a watermarked preview of `bytes` within the byte budget.
    ///
    /// Only a failure of the final placeholder state is returned as an error.
    pub fn process_for_preview(
        &self,
        bytes: &[u8],
        options: &PreviewOptions,
    ) -> Result<OptimizedResult, PreviewError> {
        let config = self.processing_config(options)?;
        let info = read_metadata(bytes);
        log::debug!(
            "preview: {} bytes, header {}x{} {}",
            bytes.len(),
            info.width,
            info.height,
            info.format.as_str()
        );

        let mut last_error = String::new();
        if let Err(e) = self.check_source_size(&info) {
            log::warn!("preview: skipping transforms: {e}");
            last_error = e.to_string();
        } else {
            for strategy in self.transform_strategies().iter().copied() {
                log::info!("preview: entering {strategy} strategy");
                match self.run_transform(bytes, &config, strategy) {
                    Ok(result) => return Ok(result),
                    Err(e) => {
                        log::warn!("preview: {strategy} strategy failed: {e}");
                        last_error = e.to_string();
                    }
                }
            }
        }

        log::info!("preview: entering placeholder strategy after: {last_error}");
        self.run_placeholder(bytes, &info, &config).map_err(|last| {
            log::error!("preview: placeholder strategy failed: {last}");
            PreviewError::Exhausted { last }
        })
    }

    /// Render fixed longer-edge breakpoints at the configured quality.
    ///
    /// Breakpoints above the source's longer edge are skipped; when all
    /// are, the source size is used once.
    pub fn generate_multi_resolution_variants(
        &self,
        bytes: &[u8],
        watermark_text: &str,
    ) -> Result<Vec<PreviewVariant>, PreviewError> {
        self.check_source_size(&read_metadata(bytes))?;
        let image = self.backend.decode(bytes).map_err(CompressError::Decode)?;
        let original = (image.width(), image.height());

        let strategy = match self.config.pipeline.profile {
            ExecutionProfile::Full => Strategy::Full,
            ExecutionProfile::Constrained => Strategy::Simplified,
        };
        let plan = CompressionPlan {
            ladder: Ladder::fixed(self.config.variants.quality),
            ..self.plan_for(strategy).map_err(CompressError::from)?
        };

        calculate_responsive_sizes(original, &self.config.variants.breakpoints)
            .into_iter()
            .map(|size| {
                let config = ProcessingConfig {
                    target_size_kb: u32::MAX,
                    max_dimension: size.target,
                    watermark_text: watermark_text.to_string(),
                    store_original: false,
                };
                let compressed = compress_image(&self.backend, &image, &config, &plan).map_err(
                    |source| PreviewError::Variant {
                        target: size.target,
                        source,
                    },
                )?;
                log::debug!(
                    "variant {}px → {}x{}, {} KB",
                    size.target,
                    compressed.dimensions.width,
                    compressed.dimensions.height,
                    compressed.actual_size_kb
                );
                Ok(PreviewVariant {
                    target: size.target,
                    width: compressed.dimensions.width,
                    height: compressed.dimensions.height,
                    actual_size_kb: compressed.actual_size_kb,
                    buffer: compressed.buffer,
                })
            })
            .collect()
    }

    fn transform_strategies(&self) -> &'static [Strategy] {
        match self.config.pipeline.profile {
            ExecutionProfile::Full => &[Strategy::Full, Strategy::Simplified],
            ExecutionProfile::Constrained => &[Strategy::Simplified],
        }
    }

    fn check_source_size(&self, info: &ImageInfo) -> Result<(), PreviewError> {
        let limit = self.config.pipeline.max_source_pixels;
        if info.is_recognised() && info.pixels() > limit {
            return Err(PreviewError::SourceTooLarge {
                pixels: info.pixels(),
                limit,
            });
        }
        Ok(())
    }

    fn plan_for(&self, strategy: Strategy) -> Result<CompressionPlan, LadderError> {
        let preview = &self.config.preview;
        let ladders = &self.config.ladder;
        let (tier, ladder, filter, effort) = match strategy {
            Strategy::Simplified | Strategy::Placeholder => (
                WatermarkTier::Simple,
                ladders.simplified_ladder()?,
                FilterType::Triangle,
                EncoderEffort::Reduced,
            ),
            Strategy::Full => (
                WatermarkTier::Dense,
                ladders.full_ladder()?,
                FilterType::Lanczos3,
                EncoderEffort::Standard,
            ),
        };
        Ok(CompressionPlan {
            tier,
            ladder,
            filter,
            effort,
            format: preview.output_format,
            deterrent_text: preview.deterrent_text.clone(),
            font_family: preview.font_family.clone(),
        })
    }

    fn run_transform(
        &self,
        bytes: &[u8],
        config: &ProcessingConfig,
        strategy: Strategy,
    ) -> Result<OptimizedResult, CompressError> {
        let plan = self.plan_for(strategy)?;
        let image = self.backend.decode(bytes).map_err(CompressError::Decode)?;
        let compressed = compress_image(&self.backend, &image, config, &plan)?;

        let placeholders = if self.config.placeholders.enabled {
            generate_placeholders(&image)
        } else {
            Placeholders::default()
        };

        log::info!(
            "preview: {strategy} strategy produced {}x{} at q{} (rung {}), {} KB",
            compressed.dimensions.width,
            compressed.dimensions.height,
            compressed.quality.value(),
            compressed.rung_index,
            compressed.actual_size_kb
        );

        Ok(OptimizedResult {
            buffer: compressed.buffer,
            final_dimensions: compressed.dimensions,
            compression_level_index: compressed.rung_index as i32,
            actual_size_kb: compressed.actual_size_kb,
            blur_data_url: placeholders.blur_data_url,
            avg_color: placeholders.avg_color,
            strategy,
            format: plan.format.mime_type(),
            within_budget: compressed.within_budget,
        })
    }

    /// Configured placeholder size, never larger than a recognised source
    /// and capped at `max_dimension` like any other preview.
    fn placeholder_size(&self, info: &ImageInfo, config: &ProcessingConfig) -> (u32, u32) {
        let pipeline = &self.config.pipeline;
        let mut size = (pipeline.placeholder_width, pipeline.placeholder_height);
        if info.is_recognised() {
            size = fit_inside(size, (info.width, info.height));
        }
        fit_longest_edge(size, config.max_dimension)
    }

    fn run_placeholder(
        &self,
        bytes: &[u8],
        info: &ImageInfo,
        config: &ProcessingConfig,
    ) -> Result<OptimizedResult, String> {
        let (buffer, final_dimensions, format) = match self.config.pipeline.placeholder_policy {
            PlaceholderPolicy::Synthesize => {
                let (width, height) = self.placeholder_size(info, config);
                let params = PlaceholderParams {
                    width,
                    height,
                    format: self.config.preview.output_format,
                };
                let buffer = self.backend.synthesize(&params).map_err(|e| e.to_string())?;
                (
                    buffer,
                    Dimensions::new(params.width, params.height),
                    params.format.mime_type(),
                )
            }
            PlaceholderPolicy::PassThrough => {
                log::warn!("preview: passing upload through without watermark");
                (
                    bytes.to_vec(),
                    Dimensions::new(info.width, info.height),
                    info.format.mime_type(),
                )
            }
        };

        if buffer.is_empty() {
            return Err("placeholder buffer is empty".to_string());
        }

        let actual_size_kb = crate::compress::size_kb(buffer.len());
        log::info!(
            "preview: placeholder strategy produced {}x{}, {} KB (budget {} KB)",
            final_dimensions.width,
            final_dimensions.height,
            actual_size_kb,
            config.target_size_kb
        );

        Ok(OptimizedResult {
            buffer,
            final_dimensions,
            compression_level_index: FALLBACK_LEVEL_INDEX,
            actual_size_kb,
            blur_data_url: None,
            avg_color: None,
            strategy: Strategy::Placeholder,
            format,
            within_budget: false,
        })
    }
}
