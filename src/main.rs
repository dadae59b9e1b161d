use clap::{Parser, Subcommand};
use proofmark::config::{self, PreviewConfig};
use proofmark::preview::{PreviewOptions, PreviewProcessor};
use proofmark::{batch, output, storage};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "proofmark")]
#[command(about = "Watermarked, size-budgeted previews for photo storefronts")]
#[command(long_about = "\
Watermarked, size-budgeted previews for photo storefronts

Every preview is resized, watermarked and compressed until it fits the byte
budget. When the full pipeline fails, a simpler one is tried; when that
fails too, a neutral placeholder is returned instead.

  full         dense tiled watermark, 9-rung quality ladder (q40 → q8)
  simplified   three-label watermark, 4-rung ladder, faster encoder
  placeholder  synthesized neutral image (or the upload, if configured)

Configuration is read from ./proofmark.toml when present, or from --config.
Run 'proofmark gen-config' to generate a documented config file.

Set RUST_LOG=debug to see every ladder rung.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./proofmark.toml if it exists)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Per-call overrides of the `[preview]` config section.
#[derive(clap::Args, Clone)]
struct PreviewArgs {
    /// Byte budget per preview, in KB
    #[arg(long)]
    target_kb: Option<u32>,

    /// Longest edge of the preview in pixels
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Watermark brand text
    #[arg(long)]
    watermark: Option<String>,
}

impl PreviewArgs {
    fn to_options(&self) -> PreviewOptions {
        PreviewOptions {
            target_size_kb: self.target_kb,
            max_dimension: self.max_dimension,
            watermark_text: self.watermark.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate a preview for one upload
    Preview {
        file: PathBuf,
        /// Directory to write the preview into
        #[arg(long, default_value = "previews")]
        out: PathBuf,
        #[command(flatten)]
        args: PreviewArgs,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate previews for every upload in a directory
    Batch {
        dir: PathBuf,
        /// Directory to write previews and manifest.json into
        #[arg(long, default_value = "previews")]
        out: PathBuf,
        #[command(flatten)]
        args: PreviewArgs,
    },
    /// Generate fixed-breakpoint variants for one upload
    Variants {
        file: PathBuf,
        /// Directory to write the variants into
        #[arg(long, default_value = "previews")]
        out: PathBuf,
        /// Watermark brand text (default: preview.watermark_text)
        #[arg(long)]
        watermark: Option<String>,
    },
    /// Estimate storage for a season of previews
    Storage {
        count: u64,
        per_item_kb: u32,
        /// Storage ceiling in GB
        #[arg(long, default_value_t = storage::DEFAULT_CEILING_GB)]
        ceiling_gb: f64,
        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock proofmark.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Preview {
            file,
            out,
            args,
            json,
        } => {
            let processor = PreviewProcessor::new(load_config(cli.config.as_deref())?);
            let bytes = std::fs::read(&file)?;
            let result = processor.process_for_preview(&bytes, &args.to_options())?;

            std::fs::create_dir_all(&out)?;
            let relative = Path::new(file.file_name().unwrap_or(file.as_os_str()));
            let target = out.join(batch::preview_path(relative, result.format));
            std::fs::write(&target, &result.buffer)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output::print_preview_result(&file.display().to_string(), &result, Some(&target));
            }
        }
        Command::Batch { dir, out, args } => {
            let config = load_config(cli.config.as_deref())?;
            let threads = config::effective_threads(&config.processing);
            let processor = PreviewProcessor::new(config);
            let manifest = batch::run_batch(&processor, &dir, &out, &args.to_options(), threads)?;
            output::print_batch_output(&manifest);
        }
        Command::Variants {
            file,
            out,
            watermark,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let text = watermark.unwrap_or_else(|| config.preview.watermark_text.clone());
            let processor = PreviewProcessor::new(config);
            let bytes = std::fs::read(&file)?;
            let variants = processor.generate_multi_resolution_variants(&bytes, &text)?;

            std::fs::create_dir_all(&out)?;
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let ext = processor.config().preview.output_format.extension();
            for variant in &variants {
                let target = out.join(format!("{stem}-{}.{ext}", variant.target));
                std::fs::write(&target, &variant.buffer)?;
            }
            output::print_variants(&file.display().to_string(), &variants);
        }
        Command::Storage {
            count,
            per_item_kb,
            ceiling_gb,
            json,
        } => {
            let analysis = storage::analyze(count, per_item_kb, ceiling_gb);
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                output::print_storage_analysis(&analysis);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Explicit `--config` must exist; otherwise `./proofmark.toml` is optional.
fn load_config(explicit: Option<&Path>) -> Result<PreviewConfig, config::ConfigError> {
    match explicit {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}
