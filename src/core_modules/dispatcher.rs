// THEORY:
// The dispatcher is the gatekeeper between decoded grids and the algorithms.
// It validates the preconditions of an invocation (matching dimensions, then
// matching color models after normalization) and picks exactly one
// algorithm family for the unified model. It owns the single implicit color
// conversion the engine performs: YCbCr grids are copied into a fresh 8-bit
// RGBA grid so they compare against decoded RGB images.

use std::borrow::Cow;

use log::debug;

use crate::core_modules::algorithms::{self, DiffFn};
use crate::core_modules::color_model::ColorModel;
use crate::core_modules::output_grid::OutputGrid;
use crate::core_modules::parallel_processor::WorkerPool;
use crate::core_modules::pixel_grid::{PixelGrid, Subpixel, ycbcr_to_rgb};
use crate::error::{DiffError, Result};

/// The per-pixel algorithm family selected for a color model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// RGBA, RGBA64, NRGBA, NRGBA64.
    Rgba,
    Cmyk,
    /// Gray, Gray16.
    Gray,
}

impl Algorithm {
    pub fn for_model(model: ColorModel) -> Result<Self> {
        match model {
            m if m.is_rgba_family() => Ok(Algorithm::Rgba),
            ColorModel::Cmyk => Ok(Algorithm::Cmyk),
            m if m.is_gray_family() => Ok(Algorithm::Gray),
            other => Err(DiffError::UnsupportedColorModel(other)),
        }
    }

    pub fn differs(self) -> DiffFn {
        match self {
            Algorithm::Rgba => algorithms::rgba_differs,
            Algorithm::Cmyk => algorithms::cmyk_differs,
            Algorithm::Gray => algorithms::gray_differs,
        }
    }

    pub fn transform<T: Subpixel>(self) -> fn(&[T], &mut [T]) {
        match self {
            Algorithm::Rgba => algorithms::swap_red_blue::<T>,
            Algorithm::Cmyk | Algorithm::Gray => algorithms::invert::<T>,
        }
    }
}

pub fn ensure_same_dimensions(left: &PixelGrid, right: &PixelGrid) -> Result<()> {
    if left.dimensions() != right.dimensions() {
        return Err(DiffError::DimensionMismatch {
            left: left.dimensions(),
            right: right.dimensions(),
        });
    }
    Ok(())
}

/// Selects the diff algorithm for two normalized grids.
pub fn select_diff(left: &PixelGrid, right: &PixelGrid) -> Result<Algorithm> {
    if left.model() != right.model() {
        return Err(DiffError::ColorModelMismatch {
            left: left.model(),
            right: right.model(),
        });
    }
    let algorithm = Algorithm::for_model(left.model())?;
    debug!("{} grids dispatched to {algorithm:?}", left.model());
    Ok(algorithm)
}

/// Selects the transform algorithm for one normalized grid.
pub fn select_transform(grid: &PixelGrid) -> Result<Algorithm> {
    let algorithm = Algorithm::for_model(grid.model())?;
    debug!("{} grid dispatched to {algorithm:?} transform", grid.model());
    Ok(algorithm)
}

/// Borrows `grid` unchanged unless it is YCbCr, in which case it is copied
/// into a freshly allocated RGBA grid.
pub fn normalize<'a>(grid: &'a PixelGrid, pool: &WorkerPool) -> Result<Cow<'a, PixelGrid>> {
    if grid.model() != ColorModel::YCbCr {
        return Ok(Cow::Borrowed(grid));
    }
    let src = u8::view(grid.samples()).ok_or(DiffError::SampleDepth {
        model: ColorModel::YCbCr,
        expected: 8,
    })?;
    let width = grid.width() as usize;
    let mut rgba =
        OutputGrid::<u8>::allocate(grid.dimensions(), ColorModel::Rgba, pool.partition(grid.width()));
    pool.fill(&mut rgba, |x, y, pixel| {
        let i = (y as usize * width + x as usize) * 3;
        let [r, g, b] = ycbcr_to_rgb(src[i], src[i + 1], src[i + 2]);
        pixel.copy_from_slice(&[r, g, b, 255]);
    });
    debug!("normalized {} YCbCr grid to RGBA", grid.dimensions());
    rgba.into_grid().map(Cow::Owned)
}
