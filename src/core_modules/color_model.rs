// THEORY:
// A `ColorModel` is the tag that tells every other module how to read the
// interleaved samples of a `PixelGrid`: how many channels a pixel has, how
// wide each sample is, and what the channels mean. It is a "dumb" tag with
// no sample data of its own.

use std::fmt;

/// Channel layout and semantics of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorModel {
    /// 8-bit, alpha-premultiplied.
    Rgba,
    /// 16-bit, alpha-premultiplied.
    Rgba64,
    /// 8-bit, straight alpha.
    Nrgba,
    /// 16-bit, straight alpha.
    Nrgba64,
    Gray,
    Gray16,
    Cmyk,
    /// 8-bit JFIF Y'CbCr, no subsampling.
    YCbCr,
    Alpha,
    Alpha16,
    Unknown,
}

impl ColorModel {
    /// Samples per pixel, or `None` for `Unknown` whose layout is carried by the grid.
    pub fn channels(self) -> Option<usize> {
        match self {
            ColorModel::Rgba
            | ColorModel::Rgba64
            | ColorModel::Nrgba
            | ColorModel::Nrgba64
            | ColorModel::Cmyk => Some(4),
            ColorModel::YCbCr => Some(3),
            ColorModel::Gray | ColorModel::Gray16 | ColorModel::Alpha | ColorModel::Alpha16 => {
                Some(1)
            }
            ColorModel::Unknown => None,
        }
    }

    /// Whether samples are 16 bits wide.
    pub fn is_wide(self) -> bool {
        matches!(
            self,
            ColorModel::Rgba64 | ColorModel::Nrgba64 | ColorModel::Gray16 | ColorModel::Alpha16
        )
    }

    pub fn is_rgba_family(self) -> bool {
        matches!(
            self,
            ColorModel::Rgba | ColorModel::Rgba64 | ColorModel::Nrgba | ColorModel::Nrgba64
        )
    }

    pub fn is_gray_family(self) -> bool {
        matches!(self, ColorModel::Gray | ColorModel::Gray16)
    }

    pub fn name(self) -> &'static str {
        match self {
            ColorModel::Rgba => "RGBA",
            ColorModel::Rgba64 => "RGBA64",
            ColorModel::Nrgba => "NRGBA",
            ColorModel::Nrgba64 => "NRGBA64",
            ColorModel::Gray => "Gray",
            ColorModel::Gray16 => "Gray16",
            ColorModel::Cmyk => "CMYK",
            ColorModel::YCbCr => "YCbCr",
            ColorModel::Alpha => "Alpha",
            ColorModel::Alpha16 => "Alpha16",
            ColorModel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ColorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
