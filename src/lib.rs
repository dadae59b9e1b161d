//! # Proofmark
//!
//! Watermarked, size-budgeted previews for school-photography storefronts.
//! An uploaded original goes in; a small preview that is safe to show
//! publicly comes out, together with a blurred placeholder and an average
//! color for progressive loading.
//!
//! # Architecture: One-Way Degradation
//!
//! ```text
//! upload bytes ─▶ read header ─▶ Full ─▶ Simplified ─▶ Placeholder
//!                                  │          │              │
//!                                  └──────────┴─▶ compress ─┘
//!                                                 (ladder × watermark × backend)
//! ```
//!
//! The [`preview`] facade owns the state machine. Each transform strategy
//! hands a [`compress::CompressionPlan`] to the [`compress`] engine, which
//! walks a quality/scale ladder and asks the [`imaging`] backend to resize,
//! composite the [`watermark`] overlay and encode each rung until one fits
//! the byte budget. Only a failure of the final placeholder state reaches
//! the caller.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`preview`] | Facade: strategy state machine, options merging, multi-resolution variants |
//! | [`compress`] | Ladder walk under a byte budget |
//! | [`watermark`] | SVG overlay composer (dense and simple tiers) |
//! | [`placeholder`] | Blur data URL and average color |
//! | [`storage`] | Storage planning against a fixed ceiling |
//! | [`imaging`] | Header parsing, backend trait, pure-Rust raster backend, dimension math |
//! | [`config`] | `proofmark.toml` loading, validation and merging |
//! | [`batch`] | Folder runs on a bounded rayon pool with a JSON manifest |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Injected Execution Profile
//!
//! Hosts with tight memory or time limits are described by configuration
//! ([`config::ExecutionProfile::Constrained`]), never detected. The core has
//! no knowledge of where it runs.
//!
//! ## Placeholder Policy
//!
//! The last-resort strategy synthesizes a neutral image by default. Passing
//! the upload through unchanged is available
//! ([`config::PlaceholderPolicy::PassThrough`]) but leaks an unwatermarked
//! original, so it must be chosen explicitly.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate (JPEG, PNG, WebP in; JPEG or
//! AVIF out); the watermark SVG is rasterised with `resvg`. No system image
//! libraries are required.

pub mod batch;
pub mod compress;
pub mod config;
pub mod imaging;
pub mod output;
pub mod placeholder;
pub mod preview;
pub mod storage;
pub mod watermark;

#[cfg(test)]
pub(crate) mod test_helpers;
