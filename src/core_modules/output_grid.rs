// THEORY:
// The `OutputGrid` is where workers write. It is allocated exactly once,
// before any worker starts, and is laid out band-major: every column range
// of the partition owns one contiguous region holding its columns for the
// full height, row-major inside the band. `bands_mut` splits that storage
// with `split_at_mut`, so each worker receives an exclusive `&mut` slice and
// the compiler, not convention, guarantees that workers' writes are disjoint.
// Once every worker is joined, `into_grid` stitches the bands back into an
// ordinary row-major `PixelGrid`.

use crate::core_modules::color_model::ColorModel;
use crate::core_modules::partitioner::ColumnRange;
use crate::core_modules::pixel_grid::{Dimensions, PixelGrid, Subpixel};
use crate::error::Result;

/// A freshly allocated result grid, split into one band per column range.
pub struct OutputGrid<T> {
    dimensions: Dimensions,
    model: ColorModel,
    channels: usize,
    ranges: Vec<ColumnRange>,
    storage: Vec<T>,
}

impl<T: Subpixel> OutputGrid<T> {
    /// Allocates storage for `dimensions` pixels of `model`, banded by `ranges`.
    ///
    /// `ranges` must tile `[0, dimensions.width)` in order, as returned by
    /// [`partition`](crate::core_modules::partitioner::partition).
    pub fn allocate(dimensions: Dimensions, model: ColorModel, ranges: Vec<ColumnRange>) -> Self {
        debug_assert_eq!(ranges.last().map_or(0, |r| r.end), dimensions.width);
        let channels = model.channels().unwrap_or(1);
        Self {
            dimensions,
            model,
            channels,
            ranges,
            storage: vec![T::DEFAULT_MIN_VALUE; dimensions.pixel_count() * channels],
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn model(&self) -> ColorModel {
        self.model
    }

    pub fn ranges(&self) -> &[ColumnRange] {
        &self.ranges
    }

    /// Hands out one exclusive band per column range, in partition order.
    pub fn bands_mut(&mut self) -> Vec<Band<'_, T>> {
        let height = self.dimensions.height as usize;
        let channels = self.channels;
        let mut rest: &mut [T] = &mut self.storage;
        let mut bands = Vec::with_capacity(self.ranges.len());
        for &range in &self.ranges {
            let len = range.len() as usize * height * channels;
            let (data, tail) = std::mem::take(&mut rest).split_at_mut(len);
            rest = tail;
            bands.push(Band {
                range,
                height: self.dimensions.height,
                channels,
                data,
            });
        }
        bands
    }

    /// Reorders the bands into a row-major grid.
    pub fn into_grid(self) -> Result<PixelGrid> {
        let Dimensions { width, height } = self.dimensions;
        let channels = self.channels;
        let row_stride = width as usize * channels;
        let mut row_major = vec![T::DEFAULT_MIN_VALUE; self.storage.len()];
        let mut band_offset = 0;
        for range in &self.ranges {
            let band_stride = range.len() as usize * channels;
            for y in 0..height as usize {
                let src = band_offset + y * band_stride;
                let dst = y * row_stride + range.start as usize * channels;
                row_major[dst..dst + band_stride]
                    .copy_from_slice(&self.storage[src..src + band_stride]);
            }
            band_offset += band_stride * height as usize;
        }
        PixelGrid::new(width, height, self.model, T::into_samples(row_major))
    }
}

/// The region of an `OutputGrid` owned by a single worker.
pub struct Band<'a, T> {
    range: ColumnRange,
    height: u32,
    channels: usize,
    data: &'a mut [T],
}

impl<T> Band<'_, T> {
    pub fn range(&self) -> ColumnRange {
        self.range
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Output samples of the pixel at absolute coordinate `(x, y)`.
    ///
    /// Panics if `x` lies outside this band's columns.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [T] {
        assert!(self.range.contains(x), "column {x} outside band {:?}", self.range);
        let local = (y as usize * self.range.len() as usize + (x - self.range.start) as usize)
            * self.channels;
        &mut self.data[local..local + self.channels]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerCount;
    use crate::core_modules::partitioner::partition;
    use crate::core_modules::pixel_grid::Samples;

    fn banded(width: u32, height: u32, workers: usize, model: ColorModel) -> OutputGrid<u8> {
        let ranges = partition(width, WorkerCount::new(workers).unwrap());
        OutputGrid::allocate(Dimensions::new(width, height), model, ranges)
    }

    #[test]
    fn bands_cover_storage_exactly() {
        let mut grid = banded(7, 3, 3, ColorModel::Nrgba);
        let bands = grid.bands_mut();
        assert_eq!(bands.len(), 3);
        let total: usize = bands.iter().map(|b| b.data.len()).sum();
        assert_eq!(total, 7 * 3 * 4);
    }

    #[test]
    fn into_grid_restores_row_major_order() {
        let mut grid = banded(5, 2, 2, ColorModel::Gray);
        for mut band in grid.bands_mut() {
            for y in 0..band.height() {
                for x in band.range().columns() {
                    band.pixel_mut(x, y)[0] = (y * 10 + x) as u8;
                }
            }
        }
        let result = grid.into_grid().unwrap();
        assert_eq!(
            result.samples(),
            &Samples::Eight(vec![0, 1, 2, 3, 4, 10, 11, 12, 13, 14])
        );
    }

    #[test]
    fn multi_channel_pixels_stay_together() {
        let mut grid = banded(3, 1, 3, ColorModel::Cmyk);
        for mut band in grid.bands_mut() {
            let x = band.range().start;
            band.pixel_mut(x, 0).copy_from_slice(&[x as u8; 4]);
        }
        let result = grid.into_grid().unwrap();
        assert_eq!(result.pixel::<u8>(2, 0), Some(&[2u8, 2, 2, 2][..]));
        assert_eq!(result.model(), ColorModel::Cmyk);
    }

    #[test]
    fn empty_bands_are_allowed() {
        let mut grid = banded(1, 4, 3, ColorModel::Gray);
        let lens: Vec<usize> = grid.bands_mut().iter().map(|b| b.data.len()).collect();
        assert_eq!(lens, vec![0, 0, 4]);
    }

    #[test]
    #[should_panic(expected = "outside band")]
    fn writing_outside_band_panics() {
        let mut grid = banded(4, 1, 2, ColorModel::Gray);
        let mut bands = grid.bands_mut();
        bands[0].pixel_mut(3, 0);
    }
}
