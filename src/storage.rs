//! Storage planning against a fixed ceiling.
//!
//! Pure arithmetic, no I/O: given how many previews a season will produce
//! and the per-preview byte target, estimate the total and suggest how to
//! get under the ceiling if it does not fit.
//!
//! ```text
//! 20000 items × 35 KB = 0.67 GB  → within 1 GB
//! 20000 items × 60 KB = 1.14 GB  → over; suggest ≤ 52 KB per item
//! ```

use serde::Serialize;

/// Storage ceiling used by [`analyze_storage_requirements`].
pub const DEFAULT_CEILING_GB: f64 = 1.0;

const KB_PER_GB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageAnalysis {
    pub item_count: u64,
    pub per_item_kb: u32,
    pub ceiling_gb: f64,
    pub total_estimated_gb: f64,
    pub within_ceiling: bool,
    /// Share of the ceiling the estimate uses, in percent.
    pub usage_percent: f64,
    /// Largest per-item target that fits, when the estimate is over.
    pub suggested_per_item_kb: Option<u32>,
    pub recommendations: Vec<String>,
}

/// Plan against the default 1 GB ceiling.
pub fn analyze_storage_requirements(item_count: u64, per_item_kb: u32) -> StorageAnalysis {
    analyze(item_count, per_item_kb, DEFAULT_CEILING_GB)
}

pub fn analyze(item_count: u64, per_item_kb: u32, ceiling_gb: f64) -> StorageAnalysis {
    let total_kb = item_count as f64 * per_item_kb as f64;
    let total_estimated_gb = total_kb / KB_PER_GB;
    let ceiling_kb = (ceiling_gb.max(0.0) * KB_PER_GB).floor();
    let within_ceiling = total_kb <= ceiling_kb;
    let usage_percent = if ceiling_kb > 0.0 {
        total_kb / ceiling_kb * 100.0
    } else {
        f64::INFINITY
    };

    let mut recommendations = Vec::new();
    let mut suggested_per_item_kb = None;

    if within_ceiling {
        recommendations.push(format!(
            "Estimated {total_estimated_gb:.2} GB uses {usage_percent:.1}% of the {ceiling_gb} GB ceiling"
        ));
        if per_item_kb > 0 {
            let headroom_items = ((ceiling_kb - total_kb) / per_item_kb as f64).floor() as u64;
            recommendations.push(format!(
                "Room for about {headroom_items} more previews at {per_item_kb} KB"
            ));
        }
    } else {
        let suggested = (ceiling_kb / item_count.max(1) as f64).floor() as u32;
        suggested_per_item_kb = Some(suggested);
        recommendations.push(format!(
            "Reduce the per-item target to {suggested} KB or lower to fit {item_count} previews in {ceiling_gb} GB"
        ));
        recommendations.push(
            "Skip previews for group photos, which are rarely purchased individually".to_string(),
        );
        recommendations.push(
            "Delete previews after orders are delivered to reclaim space".to_string(),
        );
    }

    StorageAnalysis {
        item_count,
        per_item_kb,
        ceiling_gb,
        total_estimated_gb,
        within_ceiling,
        usage_percent,
        suggested_per_item_kb,
        recommendations,
    }
}
