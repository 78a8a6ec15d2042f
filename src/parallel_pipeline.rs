// THEORY:
// The batch runner drives many independent invocations: one job per image
// pair in diff mode, one per image in transform mode. Jobs are blocking,
// CPU-bound work, so each one runs on tokio's blocking pool; a semaphore caps
// how many run at once, since every running job already owns a full pool of
// pixel workers. A failed job is reported and the batch carries on. Reports
// come back in submission order, whatever order the jobs finished in.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use log::{error, info};
use tokio::sync::Semaphore;

use crate::core_modules::utils::{decode, encode, output_path};
use crate::error::{DiffError, Result};
use crate::pipeline::DiffEngine;

pub const DIFF_SUFFIX: &str = "_diff";
pub const TRANSFORM_SUFFIX: &str = "_transform";

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Diff { left: PathBuf, right: PathBuf },
    Transform { input: PathBuf },
}

impl Job {
    /// Pairs up `files` in order: (0, 1), (2, 3), ...
    ///
    /// Returns `None` if a file is left without a partner.
    pub fn pairs(files: Vec<PathBuf>) -> Option<Vec<Job>> {
        if files.len() % 2 != 0 {
            return None;
        }
        let mut files = files.into_iter();
        let mut jobs = Vec::new();
        while let (Some(left), Some(right)) = (files.next(), files.next()) {
            jobs.push(Job::Diff { left, right });
        }
        Some(jobs)
    }

    /// The file whose path and format name the output.
    pub fn primary_input(&self) -> &Path {
        match self {
            Job::Diff { left, .. } => left,
            Job::Transform { input } => input,
        }
    }
}

/// Outcome of one job: the written output path, or why it failed.
#[derive(Debug)]
pub struct JobReport {
    pub job: Job,
    pub outcome: Result<PathBuf>,
}

pub struct BatchRunner {
    engine: Arc<DiffEngine>,
    suffix: Option<String>,
}

impl BatchRunner {
    pub fn new(engine: DiffEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            suffix: None,
        }
    }

    /// Uses `suffix` for every output instead of the per-mode default.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    fn suffix_for(&self, job: &Job) -> String {
        match (&self.suffix, job) {
            (Some(suffix), _) => suffix.clone(),
            (None, Job::Diff { .. }) => DIFF_SUFFIX.to_string(),
            (None, Job::Transform { .. }) => TRANSFORM_SUFFIX.to_string(),
        }
    }

    pub async fn run(&self, jobs: Vec<Job>) -> Vec<JobReport> {
        let permits = Arc::new(Semaphore::new(self.engine.config().concurrent_jobs.get()));
        let tasks = jobs.into_iter().map(|job| {
            let permits = Arc::clone(&permits);
            let engine = Arc::clone(&self.engine);
            let suffix = self.suffix_for(&job);
            async move {
                let outcome = run_permitted(permits, engine, job.clone(), suffix).await;
                match &outcome {
                    Ok(path) => info!("{} -> {}", job.primary_input().display(), path.display()),
                    Err(err) => error!("{}: {err}", job.primary_input().display()),
                }
                JobReport { job, outcome }
            }
        });
        join_all(tasks).await
    }
}

/// Waits for a permit, then runs `job` on the blocking pool while holding it.
/// Fails without running the job if the semaphore has been closed.
async fn run_permitted(
    permits: Arc<Semaphore>,
    engine: Arc<DiffEngine>,
    job: Job,
    suffix: String,
) -> Result<PathBuf> {
    let _permit = permits.acquire_owned().await?;
    tokio::task::spawn_blocking(move || run_job(&engine, &job, &suffix))
        .await
        .map_err(DiffError::from)
        .and_then(|outcome| outcome)
}

/// Runs a single job to completion on the calling thread.
pub fn run_job(engine: &DiffEngine, job: &Job, suffix: &str) -> Result<PathBuf> {
    match job {
        Job::Diff { left, right } => {
            let (left_grid, format) = decode(left)?;
            let (right_grid, _) = decode(right)?;
            let mask = engine.compute_diff(&left_grid, &right_grid)?;
            let output = output_path(left, suffix, &format);
            encode(&mask, &format, &output)?;
            Ok(output)
        }
        Job::Transform { input } => {
            let (grid, format) = decode(input)?;
            let transformed = engine.compute_transform(&grid)?;
            let output = output_path(input, suffix, &format);
            encode(&transformed, &format, &output)?;
            Ok(output)
        }
    }
}
