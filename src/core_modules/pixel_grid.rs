// THEORY:
// The `PixelGrid` is the most fundamental unit of the engine. It is a "dumb",
// immutable container: interleaved row-major samples plus the `ColorModel`
// tag that says how to read them. Everything that compares or transforms
// pixels lives elsewhere; the grid only knows how to hand out one pixel's
// samples, or that pixel's color through the full-precision accessor.
//
// The accessor (`rgba`) is the common currency for comparisons. It returns
// alpha-premultiplied channels normalized to 16 bits (0..=0xffff), whatever
// the stored depth or layout, so two grids of the same model compare by
// color rather than by raw bytes. Two NRGBA pixels that are both fully
// transparent therefore read as equal even if their color bytes differ.

use std::fmt;

use crate::core_modules::color_model::ColorModel;
use crate::error::{DiffError, Result};

/// Width and height of a grid, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Interleaved sample storage at one of the two supported depths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    Eight(Vec<u8>),
    Sixteen(Vec<u16>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Eight(v) => v.len(),
            Samples::Sixteen(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, Samples::Sixteen(_))
    }
}

/// A sample type a grid can be stored in.
pub trait Subpixel: image::Primitive + Send + Sync + 'static {
    fn view(samples: &Samples) -> Option<&[Self]>;
    fn into_samples(values: Vec<Self>) -> Samples;
}

impl Subpixel for u8 {
    fn view(samples: &Samples) -> Option<&[u8]> {
        match samples {
            Samples::Eight(v) => Some(v),
            Samples::Sixteen(_) => None,
        }
    }

    fn into_samples(values: Vec<u8>) -> Samples {
        Samples::Eight(values)
    }
}

impl Subpixel for u16 {
    fn view(samples: &Samples) -> Option<&[u16]> {
        match samples {
            Samples::Sixteen(v) => Some(v),
            Samples::Eight(_) => None,
        }
    }

    fn into_samples(values: Vec<u16>) -> Samples {
        Samples::Sixteen(values)
    }
}

/// An immutable 2-D grid of color samples with a declared color model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    dimensions: Dimensions,
    model: ColorModel,
    channels: usize,
    samples: Samples,
}

impl PixelGrid {
    /// Builds a grid, checking that `samples` holds exactly one pixel per
    /// coordinate at the depth `model` requires.
    ///
    /// `Unknown` grids must be built with [`PixelGrid::with_channels`].
    pub fn new(width: u32, height: u32, model: ColorModel, samples: Samples) -> Result<Self> {
        let channels = model.channels().unwrap_or(1);
        Self::build(Dimensions::new(width, height), model, channels, samples)
    }

    /// Builds an `Unknown` grid whose pixels carry `channels` samples each.
    pub fn with_channels(width: u32, height: u32, channels: usize, samples: Samples) -> Result<Self> {
        Self::build(
            Dimensions::new(width, height),
            ColorModel::Unknown,
            channels.max(1),
            samples,
        )
    }

    fn build(
        dimensions: Dimensions,
        model: ColorModel,
        channels: usize,
        samples: Samples,
    ) -> Result<Self> {
        if model != ColorModel::Unknown && model.is_wide() != samples.is_wide() {
            return Err(DiffError::SampleDepth {
                model,
                expected: if model.is_wide() { 16 } else { 8 },
            });
        }
        let expected = dimensions.pixel_count() * channels;
        if samples.len() != expected {
            return Err(DiffError::MalformedGrid {
                model,
                dimensions,
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            dimensions,
            model,
            channels,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn model(&self) -> ColorModel {
        self.model
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_samples(self) -> Samples {
        self.samples
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.dimensions.width as usize + x as usize) * self.channels
    }

    /// Samples of the pixel at `(x, y)`, if the grid is stored as `T`.
    ///
    /// Panics if the coordinate lies outside the grid.
    pub fn pixel<T: Subpixel>(&self, x: u32, y: u32) -> Option<&[T]> {
        let offset = self.offset(x, y);
        T::view(&self.samples).map(|v| &v[offset..offset + self.channels])
    }

    /// Full-precision color of the pixel at `(x, y)`: alpha-premultiplied
    /// R, G, B, A in 0..=0xffff.
    ///
    /// `Unknown` grids read as transparent black. Panics if the coordinate
    /// lies outside the grid.
    pub fn rgba(&self, x: u32, y: u32) -> [u32; 4] {
        let offset = self.offset(x, y);
        match &self.samples {
            Samples::Eight(v) => rgba_from_eight(self.model, &v[offset..offset + self.channels]),
            Samples::Sixteen(v) => {
                rgba_from_sixteen(self.model, &v[offset..offset + self.channels])
            }
        }
    }
}

#[inline]
fn widen(v: u8) -> u32 {
    u32::from(v) * 0x101
}

fn rgba_from_eight(model: ColorModel, s: &[u8]) -> [u32; 4] {
    match model {
        ColorModel::Rgba => [widen(s[0]), widen(s[1]), widen(s[2]), widen(s[3])],
        ColorModel::Nrgba => {
            let a = u32::from(s[3]);
            [
                widen(s[0]) * a / 0xff,
                widen(s[1]) * a / 0xff,
                widen(s[2]) * a / 0xff,
                widen(s[3]),
            ]
        }
        ColorModel::Gray => {
            let g = widen(s[0]);
            [g, g, g, 0xffff]
        }
        ColorModel::Cmyk => cmyk_to_rgba(s[0], s[1], s[2], s[3]),
        ColorModel::YCbCr => {
            let [r, g, b] = ycbcr_to_rgb(s[0], s[1], s[2]);
            [widen(r), widen(g), widen(b), 0xffff]
        }
        ColorModel::Alpha => {
            let a = widen(s[0]);
            [a, a, a, a]
        }
        _ => [0; 4],
    }
}

fn rgba_from_sixteen(model: ColorModel, s: &[u16]) -> [u32; 4] {
    match model {
        ColorModel::Rgba64 => [s[0].into(), s[1].into(), s[2].into(), s[3].into()],
        ColorModel::Nrgba64 => {
            let a = u32::from(s[3]);
            [
                u32::from(s[0]) * a / 0xffff,
                u32::from(s[1]) * a / 0xffff,
                u32::from(s[2]) * a / 0xffff,
                a,
            ]
        }
        ColorModel::Gray16 => {
            let g = u32::from(s[0]);
            [g, g, g, 0xffff]
        }
        ColorModel::Alpha16 => {
            let a = u32::from(s[0]);
            [a, a, a, a]
        }
        _ => [0; 4],
    }
}

/// CMYK to opaque premultiplied RGBA in 0..=0xffff.
pub fn cmyk_to_rgba(c: u8, m: u8, y: u8, k: u8) -> [u32; 4] {
    let w = 0xffff - widen(k);
    [
        (0xffff - widen(c)) * w / 0xffff,
        (0xffff - widen(m)) * w / 0xffff,
        (0xffff - widen(y)) * w / 0xffff,
        0xffff,
    ]
}

/// JFIF Y'CbCr to 8-bit RGB using 16.16 fixed point.
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let yy = i32::from(y) * 0x10101;
    let cb = i32::from(cb) - 128;
    let cr = i32::from(cr) - 128;
    let clamp = |v: i32| (v >> 16).clamp(0, 255) as u8;
    [
        clamp(yy + 91881 * cr),
        clamp(yy - 22554 * cb - 46802 * cr),
        clamp(yy + 116130 * cb),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        let err = PixelGrid::new(2, 2, ColorModel::Gray, Samples::Eight(vec![0; 3])).unwrap_err();
        assert!(matches!(
            err,
            DiffError::MalformedGrid {
                expected: 4,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn rejects_wrong_depth() {
        let err = PixelGrid::new(1, 1, ColorModel::Gray16, Samples::Eight(vec![0])).unwrap_err();
        assert!(matches!(err, DiffError::SampleDepth { expected: 16, .. }));
    }

    #[test]
    fn empty_grid_is_legal() {
        let grid = PixelGrid::new(0, 7, ColorModel::Rgba, Samples::Eight(Vec::new())).unwrap();
        assert_eq!(grid.dimensions(), Dimensions::new(0, 7));
    }

    #[test]
    fn pixel_returns_interleaved_samples() {
        let grid = PixelGrid::new(
            2,
            1,
            ColorModel::Nrgba,
            Samples::Eight(vec![1, 2, 3, 4, 5, 6, 7, 8]),
        )
        .unwrap();
        assert_eq!(grid.pixel::<u8>(1, 0), Some(&[5u8, 6, 7, 8][..]));
        assert_eq!(grid.pixel::<u16>(1, 0), None);
    }

    #[test]
    fn gray_widens_and_is_opaque() {
        let grid = PixelGrid::new(1, 1, ColorModel::Gray, Samples::Eight(vec![0x80])).unwrap();
        assert_eq!(grid.rgba(0, 0), [0x8080, 0x8080, 0x8080, 0xffff]);
    }

    #[test]
    fn transparent_nrgba_pixels_read_equal() {
        let grid = PixelGrid::new(
            2,
            1,
            ColorModel::Nrgba,
            Samples::Eight(vec![255, 0, 0, 0, 0, 255, 0, 0]),
        )
        .unwrap();
        assert_eq!(grid.rgba(0, 0), [0, 0, 0, 0]);
        assert_eq!(grid.rgba(0, 0), grid.rgba(1, 0));
    }

    #[test]
    fn opaque_nrgba64_is_unchanged() {
        let grid = PixelGrid::new(
            1,
            1,
            ColorModel::Nrgba64,
            Samples::Sixteen(vec![1000, 2000, 3000, 0xffff]),
        )
        .unwrap();
        assert_eq!(grid.rgba(0, 0), [1000, 2000, 3000, 0xffff]);
    }

    #[test]
    fn cmyk_conversion_endpoints() {
        assert_eq!(cmyk_to_rgba(0, 0, 0, 0), [0xffff, 0xffff, 0xffff, 0xffff]);
        assert_eq!(cmyk_to_rgba(0, 0, 0, 255), [0, 0, 0, 0xffff]);
        assert_eq!(cmyk_to_rgba(255, 0, 0, 0), [0, 0xffff, 0xffff, 0xffff]);
    }

    #[test]
    fn ycbcr_conversion_neutral_and_clamped() {
        assert_eq!(ycbcr_to_rgb(255, 128, 128), [255, 255, 255]);
        assert_eq!(ycbcr_to_rgb(0, 128, 128), [0, 0, 0]);
        assert_eq!(ycbcr_to_rgb(128, 128, 128), [128, 128, 128]);
        // Saturated red: Cr at maximum pushes red past 255 and green below 0.
        let [r, g, _] = ycbcr_to_rgb(255, 128, 255);
        assert_eq!((r, g), (255, 165));
        assert_eq!(ycbcr_to_rgb(0, 128, 255)[1], 0);
    }

    #[test]
    fn unknown_reads_transparent_black() {
        let grid = PixelGrid::with_channels(1, 1, 2, Samples::Eight(vec![9, 9])).unwrap();
        assert_eq!(grid.model(), ColorModel::Unknown);
        assert_eq!(grid.rgba(0, 0), [0; 4]);
    }
}
