// THEORY:
// Configuration is resolved once, at the call boundary, and passed down
// explicitly. The engine never asks the host how many CPUs it has; it only
// ever sees a `WorkerCount`. Tests pin the count for determinism, the binary
// uses `WorkerCount::available()` unless told otherwise.

use std::fmt;
use std::num::NonZeroUsize;

/// Number of parallel workers an invocation may use. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerCount(NonZeroUsize);

impl WorkerCount {
    pub const ONE: WorkerCount = WorkerCount(NonZeroUsize::MIN);

    /// Returns `None` for zero.
    pub fn new(count: usize) -> Option<Self> {
        NonZeroUsize::new(count).map(WorkerCount)
    }

    /// One worker per logical CPU of the host.
    pub fn available() -> Self {
        NonZeroUsize::new(num_cpus::get()).map_or(Self::ONE, WorkerCount)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl From<NonZeroUsize> for WorkerCount {
    fn from(count: NonZeroUsize) -> Self {
        WorkerCount(count)
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self::available()
    }
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for `DiffEngine` and the batch runner.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Workers per diff/transform invocation.
    pub workers: WorkerCount,
    /// How many batch jobs may run at the same time. Each running job owns
    /// its own pool of `workers` threads.
    pub concurrent_jobs: NonZeroUsize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: WorkerCount::available(),
            concurrent_jobs: NonZeroUsize::MIN,
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: WorkerCount) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_concurrent_jobs(mut self, jobs: NonZeroUsize) -> Self {
        self.concurrent_jobs = jobs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_is_rejected() {
        assert_eq!(WorkerCount::new(0), None);
        assert_eq!(WorkerCount::new(3).map(WorkerCount::get), Some(3));
    }

    #[test]
    fn available_is_at_least_one() {
        assert!(WorkerCount::available().get() >= 1);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = EngineConfig::default()
            .with_workers(WorkerCount::ONE)
            .with_concurrent_jobs(NonZeroUsize::new(4).unwrap());
        assert_eq!(config.workers.get(), 1);
        assert_eq!(config.concurrent_jobs.get(), 4);
    }
}
