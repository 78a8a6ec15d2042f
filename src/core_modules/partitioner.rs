// THEORY:
// The partitioner divides the column space of an image among the workers.
// It is pure arithmetic: no pixels, no threads. Range `i` of `P` covers
// columns [floor(W*i/P), floor(W*(i+1)/P)), with the last range pinned to W
// so integer rounding never leaves a gap at the right edge. Ranges tile the
// domain in order, never overlap, and may be empty when there are more
// workers than columns.

use std::ops::Range;

use crate::config::WorkerCount;

/// A half-open range of columns owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnRange {
    pub start: u32,
    pub end: u32,
}

impl ColumnRange {
    pub fn len(self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn contains(self, x: u32) -> bool {
        self.start <= x && x < self.end
    }

    pub fn columns(self) -> Range<u32> {
        self.start..self.end
    }
}

/// Splits `[0, width)` into `workers` ordered, disjoint column ranges.
pub fn partition(width: u32, workers: WorkerCount) -> Vec<ColumnRange> {
    let count = workers.get() as u64;
    let width_wide = u64::from(width);
    let boundary = |i: u64| (width_wide * i / count) as u32;
    (0..count)
        .map(|i| ColumnRange {
            start: boundary(i),
            end: if i == count - 1 { width } else { boundary(i + 1) },
        })
        .collect()
}
