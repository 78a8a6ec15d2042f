// THEORY:
// The `pipeline` module is the top-level API of the engine. It wires the
// layers together for one invocation:
//
//   validate dimensions -> start worker pool -> normalize YCbCr -> dispatch
//   -> allocate output -> fill in parallel -> stitch bands into a grid
//
// Each invocation owns its pool and its output grid. Nothing is returned
// until the grid is complete; any failure aborts the invocation with no
// partial result.

use log::debug;

use crate::config::EngineConfig;
use crate::core_modules::algorithms::mask_value;
use crate::core_modules::color_model::ColorModel;
use crate::core_modules::dispatcher::{self, Algorithm};
use crate::core_modules::output_grid::OutputGrid;
use crate::core_modules::parallel_processor::WorkerPool;
use crate::core_modules::pixel_grid::{PixelGrid, Samples, Subpixel};
use crate::error::Result;

/// The diff/transform engine.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    config: EngineConfig,
}

impl DiffEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Computes the difference mask of two grids: an 8-bit Gray grid that is
    /// 255 where the pixels match and 0 where they differ.
    pub fn compute_diff(&self, left: &PixelGrid, right: &PixelGrid) -> Result<PixelGrid> {
        dispatcher::ensure_same_dimensions(left, right)?;
        let pool = WorkerPool::new(self.config.workers)?;
        let left = dispatcher::normalize(left, &pool)?;
        let right = dispatcher::normalize(right, &pool)?;
        let algorithm = dispatcher::select_diff(&left, &right)?;

        let dimensions = left.dimensions();
        debug!(
            "diffing {dimensions} {} grids with {} workers",
            left.model(),
            pool.workers()
        );
        let differs = algorithm.differs();
        let (left, right) = (left.as_ref(), right.as_ref());
        let mut mask =
            OutputGrid::<u8>::allocate(dimensions, ColorModel::Gray, pool.partition(dimensions.width));
        pool.fill(&mut mask, |x, y, pixel| {
            pixel[0] = mask_value(differs(left, right, x, y));
        });
        mask.into_grid()
    }

    /// Rewrites every pixel of one grid: RGBA-family grids get red and blue
    /// swapped, CMYK and gray grids are inverted. The output keeps the
    /// (normalized) input's model and depth.
    pub fn compute_transform(&self, grid: &PixelGrid) -> Result<PixelGrid> {
        let pool = WorkerPool::new(self.config.workers)?;
        let grid = dispatcher::normalize(grid, &pool)?;
        let algorithm = dispatcher::select_transform(&grid)?;
        debug!(
            "transforming {} {} grid with {} workers",
            grid.dimensions(),
            grid.model(),
            pool.workers()
        );
        match grid.samples() {
            Samples::Eight(src) => transform_with(&pool, &grid, src.as_slice(), algorithm),
            Samples::Sixteen(src) => transform_with(&pool, &grid, src.as_slice(), algorithm),
        }
    }
}

fn transform_with<T: Subpixel>(
    pool: &WorkerPool,
    grid: &PixelGrid,
    src: &[T],
    algorithm: Algorithm,
) -> Result<PixelGrid> {
    let channels = grid.channels();
    let width = grid.width() as usize;
    let apply = algorithm.transform::<T>();
    let mut out = OutputGrid::<T>::allocate(grid.dimensions(), grid.model(), pool.partition(grid.width()));
    pool.fill(&mut out, |x, y, pixel| {
        let i = (y as usize * width + x as usize) * channels;
        apply(&src[i..i + channels], pixel);
    });
    out.into_grid()
}

/// [`DiffEngine::compute_diff`] with the default configuration.
pub fn compute_diff(left: &PixelGrid, right: &PixelGrid) -> Result<PixelGrid> {
    DiffEngine::default().compute_diff(left, right)
}

/// [`DiffEngine::compute_transform`] with the default configuration.
pub fn compute_transform(grid: &PixelGrid) -> Result<PixelGrid> {
    DiffEngine::default().compute_transform(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerCount;
    use crate::core_modules::pixel_grid::{Dimensions, ycbcr_to_rgb};
    use crate::error::DiffError;

    fn engine(workers: usize) -> DiffEngine {
        DiffEngine::new(EngineConfig::default().with_workers(WorkerCount::new(workers).unwrap()))
    }

    fn grid8(width: u32, height: u32, model: ColorModel, samples: Vec<u8>) -> PixelGrid {
        PixelGrid::new(width, height, model, Samples::Eight(samples)).unwrap()
    }

    fn mask_of(grid: &PixelGrid) -> &[u8] {
        match grid.samples() {
            Samples::Eight(v) => v,
            Samples::Sixteen(_) => panic!("mask must be 8-bit"),
        }
    }

    /// Deterministic NRGBA test pattern.
    fn pattern(width: u32, height: u32) -> Vec<u8> {
        (0..width * height * 4).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test_log::test]
    fn identical_white_images_are_all_same() {
        let white = grid8(4, 4, ColorModel::Rgba, vec![255; 64]);
        let mask = engine(4).compute_diff(&white, &white.clone()).unwrap();
        assert_eq!(mask.dimensions(), Dimensions::new(4, 4));
        assert_eq!(mask.model(), ColorModel::Gray);
        assert_eq!(mask_of(&mask), &[255u8; 16][..]);
    }

    #[test]
    fn single_differing_pixel_is_black() {
        let a = grid8(2, 2, ColorModel::Rgba, vec![255; 16]);
        let mut changed = vec![255; 16];
        changed[3 * 4] = 0;
        let b = grid8(2, 2, ColorModel::Rgba, changed);
        let mask = engine(2).compute_diff(&a, &b).unwrap();
        // Row-major: (0,0), (1,0), (0,1), (1,1).
        assert_eq!(mask_of(&mask), &[255, 255, 255, 0]);
    }

    #[test]
    fn self_diff_is_white_for_every_supported_model() {
        let grids = [
            grid8(5, 3, ColorModel::Nrgba, pattern(5, 3)),
            grid8(5, 3, ColorModel::Cmyk, pattern(5, 3)),
            grid8(5, 3, ColorModel::Gray, pattern(5, 3)[..15].to_vec()),
            grid8(5, 3, ColorModel::YCbCr, pattern(5, 3)[..45].to_vec()),
            PixelGrid::new(
                5,
                3,
                ColorModel::Rgba64,
                Samples::Sixteen((0..60).map(|i| i * 1000).collect()),
            )
            .unwrap(),
            PixelGrid::new(
                5,
                3,
                ColorModel::Gray16,
                Samples::Sixteen((0..15).map(|i| i * 4000).collect()),
            )
            .unwrap(),
        ];
        for grid in &grids {
            let mask = engine(3).compute_diff(grid, grid).unwrap();
            assert!(mask_of(&mask).iter().all(|&v| v == 255), "{}", grid.model());
        }
    }

    #[test]
    fn mask_is_indicator_of_inequality() {
        let (width, height) = (9, 6);
        let a: Vec<u8> = (0..width * height).map(|i| (i % 7) as u8).collect();
        let b: Vec<u8> = (0..width * height).map(|i| (i % 5) as u8).collect();
        let mask = engine(4)
            .compute_diff(
                &grid8(width, height, ColorModel::Gray, a.clone()),
                &grid8(width, height, ColorModel::Gray, b.clone()),
            )
            .unwrap();
        let expected: Vec<u8> = a
            .iter()
            .zip(&b)
            .map(|(x, y)| if x == y { 255 } else { 0 })
            .collect();
        assert_eq!(mask_of(&mask), &expected[..]);
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        let a = grid8(10, 10, ColorModel::Gray, vec![0; 100]);
        let b = grid8(10, 11, ColorModel::Gray, vec![0; 110]);
        let err = engine(2).compute_diff(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            DiffError::DimensionMismatch { left, right }
                if left == Dimensions::new(10, 10) && right == Dimensions::new(10, 11)
        ));
    }

    #[test]
    fn color_model_mismatch_is_fatal() {
        let a = grid8(2, 2, ColorModel::Rgba, vec![0; 16]);
        let b = grid8(2, 2, ColorModel::Cmyk, vec![0; 16]);
        assert!(matches!(
            engine(2).compute_diff(&a, &b),
            Err(DiffError::ColorModelMismatch { .. })
        ));
    }

    #[test]
    fn straight_and_premultiplied_rgba_do_not_mix() {
        let a = grid8(1, 1, ColorModel::Rgba, vec![0; 4]);
        let b = grid8(1, 1, ColorModel::Nrgba, vec![0; 4]);
        assert!(matches!(
            engine(1).compute_diff(&a, &b),
            Err(DiffError::ColorModelMismatch {
                left: ColorModel::Rgba,
                right: ColorModel::Nrgba
            })
        ));
    }

    #[test]
    fn alpha_grids_are_unsupported() {
        let a = grid8(2, 1, ColorModel::Alpha, vec![1, 2]);
        assert!(matches!(
            engine(1).compute_diff(&a, &a),
            Err(DiffError::UnsupportedColorModel(ColorModel::Alpha))
        ));
        assert!(matches!(
            engine(1).compute_transform(&a),
            Err(DiffError::UnsupportedColorModel(ColorModel::Alpha))
        ));
    }

    #[test]
    fn ycbcr_matches_its_rgba_rendering() {
        let ycbcr_samples: Vec<u8> = (0..4 * 3 * 3).map(|i| (i * 37 % 256) as u8).collect();
        let rgba_samples: Vec<u8> = ycbcr_samples
            .chunks_exact(3)
            .flat_map(|p| {
                let [r, g, b] = ycbcr_to_rgb(p[0], p[1], p[2]);
                [r, g, b, 255]
            })
            .collect();
        let ycbcr = grid8(4, 3, ColorModel::YCbCr, ycbcr_samples);
        let rgba = grid8(4, 3, ColorModel::Rgba, rgba_samples);
        let mask = engine(2).compute_diff(&ycbcr, &rgba).unwrap();
        assert!(mask_of(&mask).iter().all(|&v| v == 255));
    }

    #[test]
    fn worker_count_does_not_change_the_result() {
        let (width, height) = (37, 23);
        let a = grid8(width, height, ColorModel::Nrgba, pattern(width, height));
        let mut changed = pattern(width, height);
        for i in (0..changed.len()).step_by(29) {
            changed[i] = changed[i].wrapping_add(1);
        }
        let b = grid8(width, height, ColorModel::Nrgba, changed);

        let reference = engine(1).compute_diff(&a, &b).unwrap();
        assert!(mask_of(&reference).contains(&0));
        for workers in [2, 3, 7, 16, 64] {
            assert_eq!(engine(workers).compute_diff(&a, &b).unwrap(), reference);
        }

        let reference = engine(1).compute_transform(&a).unwrap();
        for workers in [2, 5, 40] {
            assert_eq!(engine(workers).compute_transform(&a).unwrap(), reference);
        }
    }

    #[test]
    fn transform_swaps_red_and_blue() {
        let grid = grid8(2, 1, ColorModel::Nrgba, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let out = engine(2).compute_transform(&grid).unwrap();
        assert_eq!(out.model(), ColorModel::Nrgba);
        assert_eq!(out.samples(), &Samples::Eight(vec![3, 2, 1, 4, 7, 6, 5, 8]));
    }

    #[test]
    fn transform_inverts_cmyk_and_gray16() {
        let cmyk = grid8(1, 1, ColorModel::Cmyk, vec![0, 10, 200, 255]);
        let out = engine(1).compute_transform(&cmyk).unwrap();
        assert_eq!(out.model(), ColorModel::Cmyk);
        assert_eq!(out.samples(), &Samples::Eight(vec![255, 245, 55, 0]));

        let gray =
            PixelGrid::new(2, 1, ColorModel::Gray16, Samples::Sixteen(vec![0, 0x1234])).unwrap();
        let out = engine(2).compute_transform(&gray).unwrap();
        assert_eq!(out.samples(), &Samples::Sixteen(vec![0xffff, 0xffff - 0x1234]));
    }

    #[test]
    fn transform_normalizes_ycbcr_first() {
        let grid = grid8(1, 1, ColorModel::YCbCr, vec![255, 128, 128]);
        let out = engine(1).compute_transform(&grid).unwrap();
        assert_eq!(out.model(), ColorModel::Rgba);
        assert_eq!(out.samples(), &Samples::Eight(vec![255, 255, 255, 255]));
    }

    #[test]
    fn unknown_grids_are_unsupported() {
        let grid = PixelGrid::with_channels(1, 1, 2, Samples::Eight(vec![0, 0])).unwrap();
        assert!(matches!(
            compute_transform(&grid),
            Err(DiffError::UnsupportedColorModel(ColorModel::Unknown))
        ));
        assert!(matches!(
            compute_diff(&grid, &grid),
            Err(DiffError::UnsupportedColorModel(ColorModel::Unknown))
        ));
    }
}
