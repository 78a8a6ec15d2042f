// Command-line front end: parses arguments, configures the engine and runs
// every requested comparison (or transform) through the batch runner.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use env_logger::Env;
use log::info;

use image_differ::parallel_pipeline::{BatchRunner, Job};
use image_differ::{DiffEngine, EngineConfig, WorkerCount};

#[derive(Parser, Debug)]
#[command(name = "image-differ")]
#[command(version, about = "Per-pixel structural diff of raster images", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,

    /// Image files: pairs to compare (a1 b1 a2 b2 ...), or single images with --transform
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Swap or invert the channels of each image instead of comparing pairs
    #[arg(short, long)]
    transform: bool,

    /// Pixel workers per image [default: number of CPUs]
    #[arg(short = 'j', long, value_name = "N", env = "IMAGE_DIFFER_WORKERS")]
    workers: Option<NonZeroUsize>,

    /// Number of images or pairs processed at the same time
    #[arg(long, value_name = "N", default_value = "1")]
    jobs: NonZeroUsize,

    /// Text inserted between the input path and the output extension
    /// [default: _diff, or _transform with --transform]
    #[arg(long, value_name = "SUFFIX")]
    suffix: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let workers = cli
        .workers
        .map_or_else(WorkerCount::available, WorkerCount::from);
    info!("workers: {workers}");
    let config = EngineConfig::default()
        .with_workers(workers)
        .with_concurrent_jobs(cli.jobs);

    let jobs = if cli.transform {
        cli.files
            .into_iter()
            .map(|input| Job::Transform { input })
            .collect()
    } else {
        Job::pairs(cli.files).context("image files must be given in pairs")?
    };

    let mut runner = BatchRunner::new(DiffEngine::new(config));
    if let Some(suffix) = cli.suffix {
        runner = runner.with_suffix(suffix);
    }

    let reports = runner.run(jobs).await;
    let failed = reports.iter().filter(|r| r.outcome.is_err()).count();
    if failed > 0 {
        bail!("{failed} of {} jobs failed", reports.len());
    }
    Ok(())
}
