//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Each upload leads with its positional index and source name; how the
//! preview was produced (strategy, rung, size against budget) follows as
//! indented context lines.
//!
//! # Output Format
//!
//! ## Preview
//!
//! ```text
//! 001-smith.jpg
//!     Preview: 500x333 jpeg, 31 KB (rung 2, full)
//!     Output: out/001-smith.jpg.preview.jpg
//!     Placeholder: rgb(122, 98, 77), blur 412 chars
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 001-smith.jpg → 001-smith.jpg.preview.jpg
//!     500x333, 31 KB (rung 2, full)
//! 002 broken.jpg → broken.jpg.preview.jpg
//!     400x300, 3 KB (placeholder, over budget)
//!
//! Generated 2 previews: 1 full, 0 simplified, 1 placeholder, 0 failed (34 KB total)
//! ```
//!
//! ## Storage
//!
//! ```text
//! 20000 items × 60 KB = 1.14 GB of 1 GB (114.4%)
//! Over ceiling
//!     - Reduce the per-item target to 52 KB or lower ...
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions do no I/O.

use crate::batch::BatchManifest;
use crate::preview::{FALLBACK_LEVEL_INDEX, OptimizedResult, PreviewVariant};
use crate::storage::StorageAnalysis;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 0-based position as a 1-based, zero-padded index.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos + 1)
}

/// Short format name from a MIME type (`image/jpeg` → `jpeg`).
fn short_format(mime: &str) -> &str {
    mime.rsplit('/').next().unwrap_or(mime)
}

/// `(rung 2, full)` / `(placeholder, over budget)`.
fn provenance(result: &OptimizedResult) -> String {
    let mut parts = Vec::new();
    if result.compression_level_index != FALLBACK_LEVEL_INDEX {
        parts.push(format!("rung {}", result.compression_level_index));
    }
    parts.push(result.strategy.to_string());
    if !result.within_budget {
        parts.push("over budget".to_string());
    }
    format!("({})", parts.join(", "))
}

fn result_line(result: &OptimizedResult) -> String {
    format!(
        "{}x{}, {} KB {}",
        result.final_dimensions.width,
        result.final_dimensions.height,
        result.actual_size_kb,
        provenance(result)
    )
}

// ============================================================================
// preview
// ============================================================================

/// Format the outcome of a single-file preview run.
pub fn format_preview_result(
    source: &str,
    result: &OptimizedResult,
    output: Option<&Path>,
) -> Vec<String> {
    let mut lines = vec![source.to_string()];
    lines.push(format!(
        "    Preview: {}x{} {}, {} KB {}",
        result.final_dimensions.width,
        result.final_dimensions.height,
        short_format(result.format),
        result.actual_size_kb,
        provenance(result)
    ));
    if let Some(output) = output {
        lines.push(format!("    Output: {}", output.display()));
    }
    match (&result.avg_color, &result.blur_data_url) {
        (Some(color), Some(blur)) => {
            lines.push(format!("    Placeholder: {color}, blur {} chars", blur.len()))
        }
        (Some(color), None) => lines.push(format!("    Placeholder: {color}")),
        (None, Some(blur)) => lines.push(format!("    Placeholder: blur {} chars", blur.len())),
        (None, None) => {}
    }
    lines
}

pub fn print_preview_result(source: &str, result: &OptimizedResult, output: Option<&Path>) {
    for line in format_preview_result(source, result, output) {
        println!("{}", line);
    }
}

// ============================================================================
// variants
// ============================================================================

/// Format fixed-breakpoint variants, one line each.
pub fn format_variants(source: &str, variants: &[PreviewVariant]) -> Vec<String> {
    let mut lines = vec![format!("{} ({} variants)", source, variants.len())];
    for variant in variants {
        lines.push(format!(
            "    {}px: {}x{}, {} KB",
            variant.target, variant.width, variant.height, variant.actual_size_kb
        ));
    }
    lines
}

pub fn print_variants(source: &str, variants: &[PreviewVariant]) {
    for line in format_variants(source, variants) {
        println!("{}", line);
    }
}

// ============================================================================
// batch
// ============================================================================

/// Format a batch run: one header per upload plus a summary line.
pub fn format_batch_output(manifest: &BatchManifest) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, entry) in manifest.entries.iter().enumerate() {
        match (&entry.output, &entry.result) {
            (Some(output), Some(result)) => {
                lines.push(format!(
                    "{} {} \u{2192} {}",
                    format_index(i),
                    entry.source,
                    output
                ));
                lines.push(format!("    {}", result_line(result)));
            }
            _ => {
                lines.push(format!("{} {}", format_index(i), entry.source));
                lines.push(format!(
                    "    Error: {}",
                    entry.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
    }

    let s = &manifest.summary;
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Generated {} previews: {} full, {} simplified, {} placeholder, {} failed ({} KB total)",
        s.total - s.failed,
        s.full,
        s.simplified,
        s.placeholder,
        s.failed,
        s.total_kb
    ));
    if s.over_budget > 0 {
        lines.push(format!("{} previews exceeded the size budget", s.over_budget));
    }
    lines
}

pub fn print_batch_output(manifest: &BatchManifest) {
    for line in format_batch_output(manifest) {
        println!("{}", line);
    }
}

// ============================================================================
// storage
// ============================================================================

/// Format a storage analysis with its recommendations.
pub fn format_storage_analysis(analysis: &StorageAnalysis) -> Vec<String> {
    let mut lines = vec![format!(
        "{} items \u{00d7} {} KB = {:.2} GB of {} GB ({:.1}%)",
        analysis.item_count,
        analysis.per_item_kb,
        analysis.total_estimated_gb,
        analysis.ceiling_gb,
        analysis.usage_percent
    )];
    lines.push(if analysis.within_ceiling {
        "Within ceiling".to_string()
    } else {
        "Over ceiling".to_string()
    });
    for rec in &analysis.recommendations {
        lines.push(format!("    - {}", rec));
    }
    lines
}

pub fn print_storage_analysis(analysis: &StorageAnalysis) {
    for line in format_storage_analysis(analysis) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchEntry, BatchSummary};
    use crate::imaging::Dimensions;
    use crate::preview::Strategy;
    use crate::storage::analyze_storage_requirements;

    fn result(strategy: Strategy, index: i32, within_budget: bool) -> OptimizedResult {
        OptimizedResult {
            buffer: vec![0; 10],
            final_dimensions: Dimensions::new(500, 333),
            compression_level_index: index,
            actual_size_kb: 31,
            blur_data_url: None,
            avg_color: None,
            strategy,
            format: "image/jpeg",
            within_budget,
        }
    }

    #[test]
    fn format_index_is_one_based_padded() {
        assert_eq!(format_index(0), "001");
        assert_eq!(format_index(41), "042");
    }

    #[test]
    fn preview_result_lines() {
        let lines = format_preview_result(
            "001-smith.jpg",
            &result(Strategy::Full, 2, true),
            Some(Path::new("out/001-smith.jpg.preview.jpg")),
        );
        assert_eq!(
            lines,
            vec![
                "001-smith.jpg",
                "    Preview: 500x333 jpeg, 31 KB (rung 2, full)",
                "    Output: out/001-smith.jpg.preview.jpg",
            ]
        );
    }

    #[test]
    fn preview_result_shows_placeholders() {
        let mut r = result(Strategy::Simplified, 0, true);
        r.avg_color = Some("rgb(1, 2, 3)".to_string());
        r.blur_data_url = Some("data:image/jpeg;base64,AAAA".to_string());
        let lines = format_preview_result("a.jpg", &r, None);
        assert_eq!(lines[2], "    Placeholder: rgb(1, 2, 3), blur 27 chars");
    }

    #[test]
    fn placeholder_result_has_no_rung() {
        let lines = format_preview_result("x.jpg", &result(Strategy::Placeholder, -1, false), None);
        assert!(lines[1].ends_with("(placeholder, over budget)"));
    }

    #[test]
    fn variants_lines() {
        let variants = vec![PreviewVariant {
            target: 300,
            width: 300,
            height: 200,
            actual_size_kb: 9,
            buffer: Vec::new(),
        }];
        let lines = format_variants("a.jpg", &variants);
        assert_eq!(lines, vec!["a.jpg (1 variants)", "    300px: 300x200, 9 KB"]);
    }

    #[test]
    fn batch_output_lists_entries_and_summary() {
        let entries = vec![
            BatchEntry {
                source: "001-smith.jpg".to_string(),
                output: Some("001-smith.jpg.preview.jpg".to_string()),
                result: Some(result(Strategy::Full, 2, true)),
                error: None,
            },
            BatchEntry {
                source: "broken.jpg".to_string(),
                output: None,
                result: None,
                error: Some("No preview could be produced: boom".to_string()),
            },
        ];
        let manifest = BatchManifest {
            summary: BatchSummary {
                total: 2,
                full: 1,
                failed: 1,
                total_kb: 31,
                ..BatchSummary::default()
            },
            entries,
        };

        let lines = format_batch_output(&manifest);
        assert_eq!(lines[0], "001 001-smith.jpg \u{2192} 001-smith.jpg.preview.jpg");
        assert_eq!(lines[1], "    500x333, 31 KB (rung 2, full)");
        assert_eq!(lines[2], "002 broken.jpg");
        assert_eq!(lines[3], "    Error: No preview could be produced: boom");
        assert_eq!(
            lines.last().unwrap(),
            "Generated 1 previews: 1 full, 0 simplified, 0 placeholder, 1 failed (31 KB total)"
        );
    }

    #[test]
    fn batch_output_flags_over_budget() {
        let manifest = BatchManifest {
            entries: Vec::new(),
            summary: BatchSummary {
                over_budget: 3,
                ..BatchSummary::default()
            },
        };
        let lines = format_batch_output(&manifest);
        assert_eq!(lines.last().unwrap(), "3 previews exceeded the size budget");
    }

    #[test]
    fn storage_over_ceiling() {
        let lines = format_storage_analysis(&analyze_storage_requirements(20_000, 60));
        assert!(lines[0].starts_with("20000 items \u{00d7} 60 KB = 1.14 GB of 1 GB"));
        assert_eq!(lines[1], "Over ceiling");
        assert!(lines[2].contains("52 KB"));
    }

    #[test]
    fn storage_within_ceiling() {
        let lines = format_storage_analysis(&analyze_storage_requirements(20_000, 35));
        assert_eq!(lines[1], "Within ceiling");
    }
}
