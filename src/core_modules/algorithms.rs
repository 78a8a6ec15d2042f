// THEORY:
// Per-pixel algorithms. Every function here is pure: it reads one pixel (or a
// pair of pixels at the same coordinate) and produces one output pixel. None
// of them knows about threads, partitions or output layout; the worker pool
// decides where and when they run.
//
// Diff algorithms answer a single question, "do these two pixels differ?",
// which the engine turns into a mask sample: white (255) for identical,
// black (0) for different. Comparisons are exact, with no tolerance.
//
// Transform algorithms rewrite the channels of one pixel in place of the
// mask: RGBA-family pixels have red and blue swapped, CMYK and gray pixels
// are inverted.

use crate::core_modules::pixel_grid::{PixelGrid, Subpixel};

/// Mask sample for identical pixels.
pub const SAME: u8 = 255;
/// Mask sample for differing pixels.
pub const DIFFERENT: u8 = 0;

pub type DiffFn = fn(&PixelGrid, &PixelGrid, u32, u32) -> bool;

#[inline]
pub fn mask_value(differs: bool) -> u8 {
    if differs { DIFFERENT } else { SAME }
}

/// RGBA family: all four full-precision channels must match.
pub fn rgba_differs(left: &PixelGrid, right: &PixelGrid, x: u32, y: u32) -> bool {
    let [r1, g1, b1, a1] = left.rgba(x, y);
    let [r2, g2, b2, a2] = right.rgba(x, y);
    r1 != r2 || g1 != g2 || b1 != b2 || a1 != a2
}

/// CMYK: compares the four channels the color accessor yields, i.e. the
/// converted RGBA color. Ink combinations that render the same color are equal.
pub fn cmyk_differs(left: &PixelGrid, right: &PixelGrid, x: u32, y: u32) -> bool {
    left.rgba(x, y) != right.rgba(x, y)
}

/// Gray family: intensity only.
pub fn gray_differs(left: &PixelGrid, right: &PixelGrid, x: u32, y: u32) -> bool {
    left.rgba(x, y)[0] != right.rgba(x, y)[0]
}

/// Copies `src` to `dst` with the first and third channels exchanged.
pub fn swap_red_blue<T: Subpixel>(src: &[T], dst: &mut [T]) {
    dst.copy_from_slice(src);
    dst.swap(0, 2);
}

/// Writes `max - v` for every channel.
pub fn invert<T: Subpixel>(src: &[T], dst: &mut [T]) {
    for (out, &v) in dst.iter_mut().zip(src) {
        *out = T::DEFAULT_MAX_VALUE - v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_model::ColorModel;
    use crate::core_modules::pixel_grid::Samples;

    fn single(model: ColorModel, samples: Vec<u8>) -> PixelGrid {
        PixelGrid::new(1, 1, model, Samples::Eight(samples)).unwrap()
    }

    #[test]
    fn mask_convention() {
        assert_eq!(mask_value(false), 255);
        assert_eq!(mask_value(true), 0);
    }

    #[test]
    fn rgba_any_channel_counts() {
        let base = single(ColorModel::Rgba, vec![10, 20, 30, 255]);
        for channel in 0..4 {
            let mut samples = vec![10, 20, 30, 255];
            samples[channel] -= 1;
            let other = single(ColorModel::Rgba, samples);
            assert!(rgba_differs(&base, &other, 0, 0), "channel {channel}");
        }
        assert!(!rgba_differs(&base, &base.clone(), 0, 0));
    }

    #[test]
    fn cmyk_compares_rendered_color() {
        let a = single(ColorModel::Cmyk, vec![0, 0, 0, 255]);
        let b = single(ColorModel::Cmyk, vec![255, 255, 255, 255]);
        let c = single(ColorModel::Cmyk, vec![0, 0, 0, 0]);
        assert!(!cmyk_differs(&a, &b, 0, 0));
        assert!(cmyk_differs(&a, &c, 0, 0));
    }

    #[test]
    fn gray_reads_intensity() {
        let a = PixelGrid::new(1, 1, ColorModel::Gray16, Samples::Sixteen(vec![300])).unwrap();
        let b = PixelGrid::new(1, 1, ColorModel::Gray16, Samples::Sixteen(vec![301])).unwrap();
        assert!(gray_differs(&a, &b, 0, 0));
        assert!(!gray_differs(&a, &a, 0, 0));
    }

    #[test]
    fn swap_and_invert() {
        let mut out = [0u8; 4];
        swap_red_blue(&[1u8, 2, 3, 4], &mut out);
        assert_eq!(out, [3, 2, 1, 4]);

        let mut out = [0u16; 1];
        invert(&[0x0100u16], &mut out);
        assert_eq!(out, [0xfeff]);

        let mut out = [0u8; 4];
        invert(&[0u8, 255, 1, 128], &mut out);
        assert_eq!(out, [255, 0, 254, 127]);
    }
}
