//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | header parser in [`header`] (JPEG SOF, PNG IHDR, WebP VP8*) |
//! | **Decode** | `image::ImageReader` with pixel limits |
//! | **Resize** | `resize_exact`, Lanczos3 or Triangle |
//! | **Watermark** | `resvg` rasterises the overlay SVG |
//! | **Encode** | JPEG (`image`) or AVIF (`rav1e` via `image`) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Header**: Header-only metadata reading
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub mod header;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    ResponsiveSize, calculate_capped_dimensions, calculate_responsive_sizes,
    calculate_rung_dimensions, fit_inside, fit_longest_edge,
};
pub use header::{ImageFormat, ImageInfo, read_metadata};
pub use params::{EncoderEffort, OutputFormat, PlaceholderParams, Quality, RenderParams};
pub use rust_backend::RustBackend;
