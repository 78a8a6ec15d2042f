// THEORY:
// The `WorkerPool` is the execution layer. It owns a fixed-size rayon pool,
// built once per invocation with exactly the requested number of threads,
// and runs a per-pixel closure over a whole grid.
//
// Key principles:
// 1.  **Column ownership**: the column space is split by the partitioner and
//     each non-empty range becomes one task. Empty ranges never spawn.
// 2.  **Row-major within a worker**: a task walks every row of the image and,
//     inside each row, the columns of its own range.
// 3.  **Join before return**: every call runs inside `ThreadPool::scope`, so
//     nothing is observable to the caller until every task has finished.
// 4.  **First error wins**: `try_fill` flags cancellation on the first failure.
//     Other tasks notice the flag between pixels and stop; the recorded error
//     is returned after the scope has joined them all.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use log::{debug, trace};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::WorkerCount;
use crate::core_modules::output_grid::OutputGrid;
use crate::core_modules::partitioner::{ColumnRange, partition};
use crate::core_modules::pixel_grid::{Dimensions, Subpixel};
use crate::error::Result;

/// A fixed-size pool of pixel workers.
pub struct WorkerPool {
    pool: ThreadPool,
    workers: WorkerCount,
}

impl WorkerPool {
    pub fn new(workers: WorkerCount) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.get())
            .thread_name(|i| format!("pixel-worker-{i}"))
            .build()?;
        debug!("worker pool started with {workers} workers");
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> WorkerCount {
        self.workers
    }

    /// Column ranges this pool assigns for a domain `width` columns wide.
    pub fn partition(&self, width: u32) -> Vec<ColumnRange> {
        partition(width, self.workers)
    }

    /// Calls `f` exactly once for every coordinate of `dimensions`.
    pub fn for_each_pixel<F>(&self, dimensions: Dimensions, f: F)
    where
        F: Fn(u32, u32) + Sync,
    {
        let ranges = self.partition(dimensions.width);
        let f = &f;
        self.pool.scope(move |scope| {
            for range in ranges.into_iter().filter(|r| !r.is_empty()) {
                scope.spawn(move |_| {
                    for y in 0..dimensions.height {
                        for x in range.columns() {
                            f(x, y);
                        }
                    }
                });
            }
        });
    }

    /// Writes every pixel of `grid` with `f`, one band per worker.
    pub fn fill<T, F>(&self, grid: &mut OutputGrid<T>, f: F)
    where
        T: Subpixel,
        F: Fn(u32, u32, &mut [T]) + Sync,
    {
        let filled = self.try_fill(grid, |x, y, pixel: &mut [T]| {
            f(x, y, pixel);
            Ok::<(), Infallible>(())
        });
        match filled {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Fallible `fill`: stops all workers on the first error and returns it.
    ///
    /// On error the contents of `grid` are unspecified and must be discarded.
    pub fn try_fill<T, E, F>(&self, grid: &mut OutputGrid<T>, f: F) -> std::result::Result<(), E>
    where
        T: Subpixel,
        E: Send,
        F: Fn(u32, u32, &mut [T]) -> std::result::Result<(), E> + Sync,
    {
        let cancelled = AtomicBool::new(false);
        let first_error: Mutex<Option<E>> = Mutex::new(None);
        let bands = grid.bands_mut();
        let (f, cancelled_ref, first_error_ref) = (&f, &cancelled, &first_error);

        self.pool.scope(move |scope| {
            for mut band in bands.into_iter().filter(|b| !b.range().is_empty()) {
                scope.spawn(move |_| {
                    let range = band.range();
                    trace!("band {}..{} started", range.start, range.end);
                    'rows: for y in 0..band.height() {
                        for x in range.columns() {
                            if cancelled_ref.load(Ordering::Relaxed) {
                                trace!("band {}..{} cancelled", range.start, range.end);
                                break 'rows;
                            }
                            if let Err(err) = f(x, y, band.pixel_mut(x, y)) {
                                let mut slot =
                                    first_error_ref.lock().unwrap_or_else(PoisonError::into_inner);
                                if slot.is_none() {
                                    *slot = Some(err);
                                }
                                cancelled_ref.store(true, Ordering::Relaxed);
                                break 'rows;
                            }
                        }
                    }
                    trace!("band {}..{} finished", range.start, range.end);
                });
            }
        });

        match first_error.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
