use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::stream::{self, StreamExt};
use log::{info, warn};
use sheet_art::core_modules::synthetic::synthetic;
use sheet_art::pipeline::{convert, is_supported_image, ConversionReport, ConvertConfig};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "sheet-art")]
#[command(about = "Turn images into spreadsheet art, one filled cell per pixel")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log every candidate size the detector tests
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a single image
    Convert {
        /// Input image path
        input: PathBuf,

        /// Output workbook path (defaults to the input path with .xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        tuning: Tuning,
    },
    /// Convert every PNG, JPEG and GIF in a directory
    Batch {
        /// Directory to scan
        dir: PathBuf,

        /// Conversions in flight at once (defaults to the CPU count)
        #[arg(short, long)]
        jobs: Option<usize>,

        #[command(flatten)]
        tuning: Tuning,
    },
    /// Write a gradient test image
    Sample {
        /// Output image path
        output: PathBuf,

        /// Side length in pixels
        #[arg(long, default_value_t = 50)]
        size: u32,
    },
}

#[derive(Args, Clone)]
struct Tuning {
    /// Longest side of the painted grid
    #[arg(long, default_value_t = 150)]
    max_size: u32,

    /// Mean absolute difference (0-255) still accepted as a pixel-art match
    #[arg(long, default_value_t = 45.0)]
    tolerance: f64,
}

impl Tuning {
    fn config(&self) -> ConvertConfig {
        ConvertConfig { max_size: self.max_size, ..ConvertConfig::with_tolerance(self.tolerance) }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Argument Parsing & Logging ---
    let cli = Cli::parse();
    let level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // --- 2. Dispatch ---
    match cli.command {
        Command::Convert { input, output, tuning } => {
            let config = tuning.config();
            let started = Instant::now();
            let report = tokio::task::spawn_blocking(move || convert(&input, output.as_deref(), &config))
                .await
                .context("conversion task panicked")?
                .context("conversion failed")?;
            print_report(&report, started.elapsed());
        }
        Command::Batch { dir, jobs, tuning } => {
            let jobs = jobs.unwrap_or_else(num_cpus::get).max(1);
            run_batch(&dir, tuning.config(), jobs).await?;
        }
        Command::Sample { output, size } => {
            let image: image::RgbImage = synthetic::gradient(size, size);
            image
                .save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Wrote {}x{} gradient to {}", size, size, output.display());
        }
    }

    Ok(())
}

fn print_report(report: &ConversionReport, elapsed: Duration) {
    println!(
        "{} ({}, {} grid) in {:.2}s",
        report.output_path.display(),
        report.detection,
        report.grid,
        elapsed.as_secs_f64()
    );
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && is_supported_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Converts every image in `dir` with at most `jobs` conversions in flight. Each
/// conversion owns its converter; a failure is logged and the batch moves on.
async fn run_batch(dir: &Path, config: ConvertConfig, jobs: usize) -> Result<()> {
    // --- 1. Discovery ---
    let images = list_images(dir)?;
    if images.is_empty() {
        warn!("No images found in {}", dir.display());
        return Ok(());
    }
    info!("Found {} images in {}, converting {} at a time", images.len(), dir.display(), jobs);

    // --- 2. Conversion ---
    let total = images.len();
    let mut conversions = stream::iter(images)
        .map(|path| {
            let config = config.clone();
            async move {
                let started = Instant::now();
                let task_path = path.clone();
                let result = tokio::task::spawn_blocking(move || convert(&task_path, None, &config)).await;
                (path, result, started.elapsed())
            }
        })
        .buffer_unordered(jobs);

    // --- 3. Reporting ---
    let mut failures = 0;
    while let Some((path, result, elapsed)) = conversions.next().await {
        match result {
            Ok(Ok(report)) => print_report(&report, elapsed),
            Ok(Err(e)) => {
                failures += 1;
                warn!("Failed to convert {}: {}", path.display(), e);
            }
            Err(e) => {
                failures += 1;
                warn!("Conversion of {} panicked: {}", path.display(), e);
            }
        }
    }

    println!("Converted {} of {} images", total - failures, total);
    if failures == total {
        bail!("every image in {} failed to convert", dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sample(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        synthetic::gradient(20, 20).save(&path).expect("sample saved");
        path
    }

    #[test]
    fn listing_keeps_supported_images_in_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_sample(dir.path(), "b.png");
        write_sample(dir.path(), "a.PNG");
        std::fs::write(dir.path().join("notes.txt"), "skip me").expect("written");
        std::fs::create_dir(dir.path().join("nested.png")).expect("created");

        let images = list_images(dir.path()).expect("listed");
        assert_eq!(images, vec![dir.path().join("a.PNG"), dir.path().join("b.png")]);
    }

    #[test]
    fn tuning_overrides_defaults() {
        let config = Tuning { max_size: 64, tolerance: 12.5 }.config();
        assert_eq!(config.max_size, 64);
        assert_eq!(config.detector.tolerance, 12.5);
        assert_eq!(config.detector.candidates, ConvertConfig::default().detector.candidates);
    }

    #[tokio::test]
    async fn batch_survives_a_broken_image() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_sample(dir.path(), "good.png");
        std::fs::write(dir.path().join("broken.png"), b"not an image").expect("written");

        run_batch(dir.path(), ConvertConfig::default(), 2).await.expect("batch completes");
        assert!(dir.path().join("good.xlsx").exists());
        assert!(!dir.path().join("broken.xlsx").exists());
    }

    #[tokio::test]
    async fn batch_fails_when_every_image_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("broken.gif"), b"GIF89a").expect("written");

        assert!(run_batch(dir.path(), ConvertConfig::default(), 1).await.is_err());
    }
}
