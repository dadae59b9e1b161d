//! Folder-at-a-time preview generation.
//!
//! Walks an upload directory, runs [`PreviewProcessor::process_for_preview`]
//! for every supported image on a bounded rayon pool and writes the results
//! next to a `manifest.json`:
//!
//! ```text
//! out/
//! ├── manifest.json
//! ├── 001-smith.jpg.preview.jpg
//! └── class-4b/
//!     └── 014-nguyen.png.preview.jpg
//! ```
//!
//! A failure on one upload is recorded in its manifest entry and does not
//! stop the batch. The manifest never contains image bytes.

use crate::imaging::ImageBackend;
use crate::preview::{OptimizedResult, PreviewError, PreviewOptions, PreviewProcessor, Strategy};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Upload extensions picked up by [`find_uploads`] (case-insensitive).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Input directory not found: {0}")]
    InputNotFound(PathBuf),
}

/// One upload's outcome.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    /// Upload path relative to the input directory.
    pub source: String,
    /// Preview path relative to the output directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OptimizedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub full: usize,
    pub simplified: usize,
    pub placeholder: usize,
    pub over_budget: usize,
    pub failed: usize,
    pub total_kb: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchManifest {
    pub entries: Vec<BatchEntry>,
    pub summary: BatchSummary,
}

impl BatchSummary {
    fn from_entries(entries: &[BatchEntry]) -> Self {
        let mut summary = Self {
            total: entries.len(),
            ..Self::default()
        };
        for entry in entries {
            match &entry.result {
                Some(result) => {
                    match result.strategy {
                        Strategy::Full => summary.full += 1,
                        Strategy::Simplified => summary.simplified += 1,
                        Strategy::Placeholder => summary.placeholder += 1,
                    }
                    if !result.within_budget {
                        summary.over_budget += 1;
                    }
                    summary.total_kb += result.actual_size_kb as u64;
                }
                None => summary.failed += 1,
            }
        }
        summary
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// All supported uploads under `dir`, sorted by path.
pub fn find_uploads(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::InputNotFound(dir.to_path_buf()));
    }
    let mut uploads = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            uploads.push(entry.into_path());
        }
    }
    uploads.sort();
    Ok(uploads)
}

/// File extension for a preview buffer of the given MIME type.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/avif" => "avif",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Preview path for `relative`, e.g. `a/b.png` → `a/b.png.preview.jpg`.
///
/// The upload's own extension stays in the name, so `smith.jpg` and
/// `smith.png` in one folder get distinct previews.
pub fn preview_path(relative: &Path, mime: &str) -> PathBuf {
    let name = relative
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    relative.with_file_name(format!("{name}.preview.{}", extension_for_mime(mime)))
}

/// Generate previews for every upload under `input_dir` into `output_dir`.
///
/// Runs on a dedicated pool of `threads` workers and writes
/// `manifest.json` into `output_dir`.
pub fn run_batch<B: ImageBackend>(
    processor: &PreviewProcessor<B>,
    input_dir: &Path,
    output_dir: &Path,
    options: &PreviewOptions,
    threads: usize,
) -> Result<BatchManifest, BatchError> {
    let uploads = find_uploads(input_dir)?;
    fs::create_dir_all(output_dir)?;
    log::info!(
        "batch: {} uploads in {} on {} threads",
        uploads.len(),
        input_dir.display(),
        threads
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()?;

    let entries: Vec<BatchEntry> = pool.install(|| {
        uploads
            .par_iter()
            .map(|path| process_one(processor, input_dir, output_dir, path, options))
            .collect()
    });

    let manifest = BatchManifest {
        summary: BatchSummary::from_entries(&entries),
        entries,
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(output_dir.join(MANIFEST_FILE_NAME), json)?;
    Ok(manifest)
}

fn process_one<B: ImageBackend>(
    processor: &PreviewProcessor<B>,
    input_dir: &Path,
    output_dir: &Path,
    path: &Path,
    options: &PreviewOptions,
) -> BatchEntry {
    let relative = path.strip_prefix(input_dir).unwrap_or(path).to_path_buf();
    let source = relative.to_string_lossy().into_owned();

    match write_preview(processor, output_dir, path, &relative, options) {
        Ok((output, result)) => BatchEntry {
            source,
            output: Some(output.to_string_lossy().into_owned()),
            result: Some(result),
            error: None,
        },
        Err(e) => {
            log::error!("batch: {source}: {e}");
            BatchEntry {
                source,
                output: None,
                result: None,
                error: Some(e.to_string()),
            }
        }
    }
}

#[derive(Error, Debug)]
enum UploadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Preview(#[from] PreviewError),
}

fn write_preview<B: ImageBackend>(
    processor: &PreviewProcessor<B>,
    output_dir: &Path,
    path: &Path,
    relative: &Path,
    options: &PreviewOptions,
) -> Result<(PathBuf, OptimizedResult), UploadError> {
    let bytes = fs::read(path)?;
    let result = processor.process_for_preview(&bytes, options)?;

    let output = preview_path(relative, result.format);
    let target = output_dir.join(&output);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, &result.buffer)?;
    log::debug!(
        "batch: {} → {} ({} KB, {})",
        relative.display(),
        output.display(),
        result.actual_size_kb,
        result.strategy
    );
    Ok((output, result))
}
