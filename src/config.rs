//! Pipeline configuration.
//!
//! Handles loading, validating, and merging `proofmark.toml`. Stock defaults
//! are overridden by a sparse user file; per-call [`PreviewOptions`] from the
//! caller are layered on top of the `[preview]` section at invocation time.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [preview]
//! target_size_kb = 50          # Byte budget per preview, in KB
//! max_dimension = 1200         # Longest-edge cap in pixels
//! watermark_text = "PROOF"     # Brand string tiled across the preview
//! deterrent_text = "PROOF - NOT FOR REPRODUCTION"
//! font_family = "DejaVu Sans, Liberation Sans, Arial, Helvetica, sans-serif"
//! output_format = "jpeg"       # "jpeg" or "avif"
//! store_original = false       # Must stay false
//!
//! [pipeline]
//! profile = "full"             # "full" or "constrained"
//! placeholder_policy = "synthesize"   # or "pass-through"
//! max_source_pixels = 100000000
//! placeholder_width = 400
//! placeholder_height = 300
//!
//! [ladder]
//! full = [{ quality = 40, scale = 1.0 }, ...]        # 9 rungs, q40 → q8
//! simplified = [{ quality = 30, scale = 1.0 }, ...]  # 4 rungs, q30 → q8
//!
//! [variants]
//! breakpoints = [300, 800, 1200]
//! quality = 30
//!
//! [placeholders]
//! enabled = true
//!
//! [processing]
//! max_processes = 4            # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! [`PreviewOptions`]: crate::preview::PreviewOptions

use crate::compress::{Ladder, LadderError, Rung};
use crate::imaging::OutputFormat;
use crate::imaging::rust_backend::DEFAULT_MAX_DECODED_PIXELS;
use crate::watermark::{DEFAULT_DETERRENT, DEFAULT_FONT_FAMILY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "proofmark.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `proofmark.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Default per-invocation settings (budget, cap, watermark).
    pub preview: PreviewDefaults,
    /// Strategy selection and safety limits.
    pub pipeline: PipelineConfig,
    /// Quality/scale ladders walked by the transform strategies.
    pub ladder: LadderConfig,
    /// Fixed-breakpoint variant generation.
    pub variants: VariantsConfig,
    /// Blur data URL and average color side products.
    pub placeholders: PlaceholdersConfig,
    /// Parallel processing settings.
    pub processing: ConcurrencyConfig,
}

impl PreviewConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.preview.validate()?;

        if self.pipeline.max_source_pixels == 0 {
            return Err(ConfigError::Validation(
                "pipeline.max_source_pixels must be non-zero".into(),
            ));
        }
        if self.pipeline.placeholder_width == 0 || self.pipeline.placeholder_height == 0 {
            return Err(ConfigError::Validation(
                "pipeline.placeholder_width/height must be non-zero".into(),
            ));
        }
        self.ladder.validate()?;
        if self.variants.breakpoints.is_empty() {
            return Err(ConfigError::Validation(
                "variants.breakpoints must not be empty".into(),
            ));
        }
        if self.variants.breakpoints.contains(&0) {
            return Err(ConfigError::Validation(
                "variants.breakpoints values must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.variants.quality) {
            return Err(ConfigError::Validation(
                "variants.quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

/// Defaults for each preview invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewDefaults {
    pub target_size_kb: u32,
    pub max_dimension: u32,
    pub watermark_text: String,
    pub deterrent_text: String,
    pub font_family: String,
    pub output_format: OutputFormat,
    /// Previews never keep the original; `true` fails validation.
    pub store_original: bool,
}

impl Default for PreviewDefaults {
    fn default() -> Self {
        Self {
            target_size_kb: 50,
            max_dimension: 1200,
            watermark_text: "PROOF".to_string(),
            deterrent_text: DEFAULT_DETERRENT.to_string(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            output_format: OutputFormat::Jpeg,
            store_original: false,
        }
    }
}

impl PreviewDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_size_kb == 0 {
            return Err(ConfigError::Validation(
                "preview.target_size_kb must be positive".into(),
            ));
        }
        if self.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "preview.max_dimension must be positive".into(),
            ));
        }
        if self.watermark_text.trim().is_empty() {
            return Err(ConfigError::Validation(
                "preview.watermark_text must not be empty".into(),
            ));
        }
        if self.store_original {
            return Err(ConfigError::Validation(
                "preview.store_original cannot be enabled for previews".into(),
            ));
        }
        Ok(())
    }
}

/// Which strategy the facade starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProfile {
    /// Start at the dense-watermark, full-ladder strategy.
    #[default]
    Full,
    /// Tight memory or time limits: start at the simplified strategy.
    Constrained,
}

/// What the last-resort strategy returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaceholderPolicy {
    /// Encode a small neutral canvas. Nothing of the upload leaks.
    #[default]
    Synthesize,
    /// Return the upload unchanged. Unwatermarked; opt-in only.
    PassThrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub profile: ExecutionProfile,
    pub placeholder_policy: PlaceholderPolicy,
    /// Header-reported pixel count above which transforms are skipped.
    pub max_source_pixels: u64,
    pub placeholder_width: u32,
    pub placeholder_height: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            profile: ExecutionProfile::Full,
            placeholder_policy: PlaceholderPolicy::Synthesize,
            max_source_pixels: DEFAULT_MAX_DECODED_PIXELS,
            placeholder_width: 400,
            placeholder_height: 300,
        }
    }
}

/// Rungs for the full and simplified strategies, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LadderConfig {
    pub full: Vec<Rung>,
    pub simplified: Vec<Rung>,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            full: Ladder::full().rungs().to_vec(),
            simplified: Ladder::simplified().rungs().to_vec(),
        }
    }
}

impl LadderConfig {
    pub fn full_ladder(&self) -> Result<Ladder, LadderError> {
        Ladder::new(self.full.clone())
    }

    pub fn simplified_ladder(&self) -> Result<Ladder, LadderError> {
        Ladder::new(self.simplified.clone())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.full_ladder()
            .map_err(|e| ConfigError::Validation(format!("ladder.full: {e}")))?;
        self.simplified_ladder()
            .map_err(|e| ConfigError::Validation(format!("ladder.simplified: {e}")))?;
        Ok(())
    }
}

/// Fixed-breakpoint variant settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariantsConfig {
    /// Longer-edge sizes to generate.
    pub breakpoints: Vec<u32>,
    pub quality: u32,
}

impl Default for VariantsConfig {
    fn default() -> Self {
        Self {
            breakpoints: vec![300, 800, 1200],
            quality: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaceholdersConfig {
    pub enabled: bool,
}

impl Default for PlaceholdersConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConcurrencyConfig {
    /// Maximum number of parallel preview workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ConcurrencyConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PreviewConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PreviewConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PreviewConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `proofmark.toml` from `dir`, falling back to stock defaults when the
/// file does not exist.
pub fn load_config(dir: &Path) -> Result<PreviewConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        log::debug!("no {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
        return resolve_config(None);
    }
    load_config_file(&path)
}

/// Load an explicit config file. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<PreviewConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    log::debug!("loaded config overrides from {}", path.display());
    resolve_config(Some(overlay))
}

/// Returns a fully-commented stock `proofmark.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Proofmark Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Preview defaults (callers may override these per upload)
# ---------------------------------------------------------------------------
[preview]
# Byte budget for one preview, in KB. The first ladder rung at or under
# target_size_kb * 1024 bytes wins.
target_size_kb = 50

# Longest edge of the preview in pixels. Smaller uploads are never enlarged.
max_dimension = 1200

# Brand string tiled across the preview and placed in the corners.
watermark_text = "PROOF"

# Larger phrase drawn diagonally through the center.
deterrent_text = "PROOF - NOT FOR REPRODUCTION"

# Font families tried in order when drawing watermark text.
font_family = "DejaVu Sans, Liberation Sans, Arial, Helvetica, sans-serif"

# Encoded preview format: "jpeg" or "avif".
output_format = "jpeg"

# Previews never keep the original upload. Setting this to true is an error.
store_original = false

# ---------------------------------------------------------------------------
# Pipeline
# ---------------------------------------------------------------------------
[pipeline]
# "full" starts with the dense watermark and full quality ladder.
# "constrained" starts with the simple watermark and short ladder, for hosts
# with tight memory or time limits.
profile = "full"

# What to return when no watermarked preview can be produced:
#   "synthesize"   - a small neutral image (nothing of the upload leaks)
#   "pass-through" - the upload unchanged (unwatermarked!)
placeholder_policy = "synthesize"

# Uploads whose header reports more pixels than this skip straight to the
# placeholder. Also bounds the decoder's allocation.
max_source_pixels = 100000000

# Size of the synthesized placeholder image.
placeholder_width = 400
placeholder_height = 300

# ---------------------------------------------------------------------------
# Compression ladders
# ---------------------------------------------------------------------------
[ladder]
# Rungs tried in order until one fits target_size_kb. Quality (1-100) and
# scale (0 < scale <= 1, applied to the capped longer edge) must never rise
# from one rung to the next.
full = [
    { quality = 40, scale = 1.0 },
    { quality = 35, scale = 1.0 },
    { quality = 30, scale = 1.0 },
    { quality = 25, scale = 0.95 },
    { quality = 20, scale = 0.9 },
    { quality = 15, scale = 0.85 },
    { quality = 12, scale = 0.8 },
    { quality = 10, scale = 0.75 },
    { quality = 8, scale = 0.7 },
]

# Shorter ladder for the simplified strategy.
simplified = [
    { quality = 30, scale = 1.0 },
    { quality = 20, scale = 0.9 },
    { quality = 12, scale = 0.8 },
    { quality = 8, scale = 0.7 },
]

# ---------------------------------------------------------------------------
# Fixed-breakpoint variants
# ---------------------------------------------------------------------------
[variants]
# Longer-edge sizes. Sizes above the upload's own are skipped.
breakpoints = [300, 800, 1200]

# Fixed encode quality for every variant (1-100).
quality = 30

# ---------------------------------------------------------------------------
# Progressive-loading placeholders
# ---------------------------------------------------------------------------
[placeholders]
# Attach a blurred data URL and an average color to every preview.
enabled = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel preview workers for batch runs.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
