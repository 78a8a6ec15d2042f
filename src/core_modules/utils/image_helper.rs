// THEORY:
// The image helper is the boundary between files on disk and `PixelGrid`s.
// Decoding maps whatever the codec produced onto one of the engine's color
// models; encoding maps a grid back onto something the target container can
// store. TIFF goes through the `tiff` crate directly so CMYK and YCbCr
// samples survive decoding untouched; every other input is content-sniffed
// by the `image` crate.

pub mod image_helper {
    use std::ffi::OsString;
    use std::fs::File;
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    use image::{DynamicImage, ImageBuffer, ImageFormat, ImageReader, Luma, Rgb, Rgba};
    use log::info;
    use tiff::ColorType;
    use tiff::decoder::{Decoder, DecodingResult, Limits};
    use tiff::encoder::{TiffEncoder, colortype};

    use crate::core_modules::color_model::ColorModel;
    use crate::core_modules::pixel_grid::{PixelGrid, Samples};
    use crate::error::{CodecError, DiffError, Result};

    /// Containers the encoder can write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Container {
        Jpeg,
        Png,
        Tiff,
    }

    impl Container {
        fn image_format(self) -> ImageFormat {
            match self {
                Container::Jpeg => ImageFormat::Jpeg,
                Container::Png => ImageFormat::Png,
                Container::Tiff => ImageFormat::Tiff,
            }
        }
    }

    /// Format of a file as named by its extension, e.g. `".png"`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FormatTag {
        extension: String,
    }

    impl FormatTag {
        pub fn from_path(path: &Path) -> Self {
            let extension = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                .unwrap_or_default();
            Self { extension }
        }

        /// Lowercased extension including the dot; empty if the path has none.
        pub fn extension(&self) -> &str {
            &self.extension
        }

        pub fn container(&self) -> Option<Container> {
            match self.extension.as_str() {
                ".jpg" | ".jpeg" => Some(Container::Jpeg),
                ".png" => Some(Container::Png),
                ".tif" | ".tiff" => Some(Container::Tiff),
                _ => None,
            }
        }
    }

    /// `<input><suffix><extension>`, e.g. `a.png` + `_diff` -> `a.png_diff.png`.
    pub fn output_path(input: &Path, suffix: &str, format: &FormatTag) -> PathBuf {
        let mut name = OsString::from(input.as_os_str());
        name.push(suffix);
        name.push(format.extension());
        PathBuf::from(name)
    }

    pub fn decode(path: &Path) -> Result<(PixelGrid, FormatTag)> {
        let format = FormatTag::from_path(path);
        let grid = match format.container() {
            Some(Container::Tiff) => decode_tiff(path)?,
            _ => decode_with_image(path)?,
        };
        info!(
            "file: {} width: {} height: {} color: {} ext: {}",
            path.display(),
            grid.width(),
            grid.height(),
            grid.model(),
            format.extension()
        );
        Ok((grid, format))
    }

    fn decode_with_image(path: &Path) -> Result<PixelGrid> {
        let image = ImageReader::open(path)
            .map_err(|e| DiffError::decode(path, e))?
            .with_guessed_format()
            .map_err(|e| DiffError::decode(path, e))?
            .decode()
            .map_err(|e| DiffError::decode(path, e))?;
        from_dynamic(image)
    }

    fn decode_tiff(path: &Path) -> Result<PixelGrid> {
        let file = File::open(path).map_err(|e| DiffError::decode(path, e))?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| DiffError::decode(path, e))?
            .with_limits(Limits::unlimited());
        let (width, height) = decoder.dimensions().map_err(|e| DiffError::decode(path, e))?;
        let color = decoder.colortype().map_err(|e| DiffError::decode(path, e))?;
        check_sample_depth(color).map_err(|e| DiffError::decode(path, e))?;
        let data = decoder.read_image().map_err(|e| DiffError::decode(path, e))?;

        let grid = match (color, data) {
            (ColorType::Gray(8), DecodingResult::U8(v)) => {
                PixelGrid::new(width, height, ColorModel::Gray, Samples::Eight(v))
            }
            (ColorType::Gray(16), DecodingResult::U16(v)) => {
                PixelGrid::new(width, height, ColorModel::Gray16, Samples::Sixteen(v))
            }
            (ColorType::RGB(8), DecodingResult::U8(v)) => {
                PixelGrid::new(width, height, ColorModel::Rgba, Samples::Eight(opaque(&v, u8::MAX)))
            }
            (ColorType::RGB(16), DecodingResult::U16(v)) => PixelGrid::new(
                width,
                height,
                ColorModel::Rgba64,
                Samples::Sixteen(opaque(&v, u16::MAX)),
            ),
            (ColorType::RGBA(8), DecodingResult::U8(v)) => {
                PixelGrid::new(width, height, ColorModel::Nrgba, Samples::Eight(v))
            }
            (ColorType::RGBA(16), DecodingResult::U16(v)) => {
                PixelGrid::new(width, height, ColorModel::Nrgba64, Samples::Sixteen(v))
            }
            (ColorType::CMYK(8), DecodingResult::U8(v)) => {
                PixelGrid::new(width, height, ColorModel::Cmyk, Samples::Eight(v))
            }
            (ColorType::YCbCr(8), DecodingResult::U8(v)) => {
                PixelGrid::new(width, height, ColorModel::YCbCr, Samples::Eight(v))
            }
            (_, DecodingResult::U8(v)) => unknown(width, height, Samples::Eight(v)),
            (_, DecodingResult::U16(v)) => unknown(width, height, Samples::Sixteen(v)),
            (color, _) => {
                return Err(DiffError::decode(
                    path,
                    CodecError::Unsupported(format!("{color:?} TIFF samples")),
                ));
            }
        };
        grid.map_err(|e| DiffError::decode(path, CodecError::Unsupported(e.to_string())))
    }

    /// Packed sub-byte samples (bilevel, 4-bit palette, ...) are not unpacked.
    pub(crate) fn check_sample_depth(color: ColorType) -> std::result::Result<(), CodecError> {
        let depth = match color {
            ColorType::Gray(n)
            | ColorType::GrayA(n)
            | ColorType::RGB(n)
            | ColorType::RGBA(n)
            | ColorType::Palette(n)
            | ColorType::CMYK(n)
            | ColorType::YCbCr(n) => n,
            _ => return Ok(()),
        };
        if depth < 8 {
            return Err(CodecError::Unsupported(format!("{depth}-bit")));
        }
        Ok(())
    }

    fn unknown(width: u32, height: u32, samples: Samples) -> Result<PixelGrid> {
        let pixels = (width as usize * height as usize).max(1);
        PixelGrid::with_channels(width, height, samples.len() / pixels, samples)
    }

    /// Expands 3-channel samples to 4 with a constant opaque alpha.
    fn opaque<T: Copy>(rgb: &[T], alpha: T) -> Vec<T> {
        rgb.chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], alpha])
            .collect()
    }

    /// Drops the alpha channel of 4-channel samples if every pixel is opaque.
    fn without_opaque_alpha<T: Copy + PartialEq>(rgba: &[T], max: T) -> Option<Vec<T>> {
        if !rgba.chunks_exact(4).all(|p| p[3] == max) {
            return None;
        }
        Some(rgba.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect())
    }

    fn gray_with_alpha<T: Copy>(la: &[T]) -> Vec<T> {
        la.chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect()
    }

    /// Maps a decoded `image` buffer onto the engine's color models.
    pub fn from_dynamic(image: DynamicImage) -> Result<PixelGrid> {
        let (width, height) = (image.width(), image.height());
        match image {
            DynamicImage::ImageLuma8(buf) => {
                PixelGrid::new(width, height, ColorModel::Gray, Samples::Eight(buf.into_raw()))
            }
            DynamicImage::ImageLuma16(buf) => {
                PixelGrid::new(width, height, ColorModel::Gray16, Samples::Sixteen(buf.into_raw()))
            }
            DynamicImage::ImageLumaA8(buf) => PixelGrid::new(
                width,
                height,
                ColorModel::Nrgba,
                Samples::Eight(gray_with_alpha(buf.as_raw())),
            ),
            DynamicImage::ImageLumaA16(buf) => PixelGrid::new(
                width,
                height,
                ColorModel::Nrgba64,
                Samples::Sixteen(gray_with_alpha(buf.as_raw())),
            ),
            DynamicImage::ImageRgb8(buf) => PixelGrid::new(
                width,
                height,
                ColorModel::Rgba,
                Samples::Eight(opaque(buf.as_raw(), u8::MAX)),
            ),
            DynamicImage::ImageRgb16(buf) => PixelGrid::new(
                width,
                height,
                ColorModel::Rgba64,
                Samples::Sixteen(opaque(buf.as_raw(), u16::MAX)),
            ),
            DynamicImage::ImageRgba8(buf) => {
                PixelGrid::new(width, height, ColorModel::Nrgba, Samples::Eight(buf.into_raw()))
            }
            DynamicImage::ImageRgba16(buf) => PixelGrid::new(
                width,
                height,
                ColorModel::Nrgba64,
                Samples::Sixteen(buf.into_raw()),
            ),
            other => PixelGrid::with_channels(
                width,
                height,
                4,
                Samples::Sixteen(other.to_rgba16().into_raw()),
            ),
        }
    }

    /// Straight-alpha 16-bit channels from a premultiplied accessor value.
    fn straighten([r, g, b, a]: [u32; 4]) -> [u16; 4] {
        if a == 0 {
            return [0; 4];
        }
        let un = |c: u32| (c * 0xffff / a).min(0xffff) as u16;
        [un(r), un(g), un(b), a as u16]
    }

    fn coordinates(grid: &PixelGrid) -> impl Iterator<Item = (u32, u32)> + use<> {
        let width = grid.width();
        (0..grid.height()).flat_map(move |y| (0..width).map(move |x| (x, y)))
    }

    /// Renders a grid as an `image` buffer, or `None` for `Unknown` grids.
    pub fn to_dynamic(grid: &PixelGrid) -> Option<DynamicImage> {
        let (width, height) = (grid.width(), grid.height());
        match (grid.model(), grid.samples()) {
            (ColorModel::Gray, Samples::Eight(v)) => {
                ImageBuffer::<Luma<u8>, _>::from_raw(width, height, v.clone())
                    .map(DynamicImage::ImageLuma8)
            }
            (ColorModel::Gray16, Samples::Sixteen(v)) => {
                ImageBuffer::<Luma<u16>, _>::from_raw(width, height, v.clone())
                    .map(DynamicImage::ImageLuma16)
            }
            (ColorModel::Nrgba, Samples::Eight(v)) => {
                ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, v.clone())
                    .map(DynamicImage::ImageRgba8)
            }
            (ColorModel::Nrgba64, Samples::Sixteen(v)) => {
                ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, v.clone())
                    .map(DynamicImage::ImageRgba16)
            }
            (ColorModel::Rgba | ColorModel::Alpha, Samples::Eight(_)) => {
                let raw: Vec<u8> = coordinates(grid)
                    .flat_map(|(x, y)| straighten(grid.rgba(x, y)).map(|c| (c >> 8) as u8))
                    .collect();
                // Opaque grids go out as RGB so they decode back as `Rgba`.
                match without_opaque_alpha(&raw, u8::MAX) {
                    Some(rgb) => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb)
                        .map(DynamicImage::ImageRgb8),
                    None => ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, raw)
                        .map(DynamicImage::ImageRgba8),
                }
            }
            (ColorModel::Rgba64 | ColorModel::Alpha16, Samples::Sixteen(_)) => {
                let raw: Vec<u16> = coordinates(grid)
                    .flat_map(|(x, y)| straighten(grid.rgba(x, y)))
                    .collect();
                match without_opaque_alpha(&raw, u16::MAX) {
                    Some(rgb) => ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, rgb)
                        .map(DynamicImage::ImageRgb16),
                    None => ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, raw)
                        .map(DynamicImage::ImageRgba16),
                }
            }
            (ColorModel::Cmyk | ColorModel::YCbCr, Samples::Eight(_)) => {
                let raw: Vec<u8> = coordinates(grid)
                    .flat_map(|(x, y)| {
                        let [r, g, b, _] = grid.rgba(x, y);
                        [(r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8]
                    })
                    .collect();
                ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, raw)
                    .map(DynamicImage::ImageRgb8)
            }
            _ => None,
        }
    }

    /// JPEG stores 8-bit gray or RGB only; alpha is dropped.
    fn jpeg_compatible(image: DynamicImage) -> DynamicImage {
        match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
            DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        }
    }

    /// Writes `grid` to `path` in the container named by `format`.
    ///
    /// The format is checked before the file is created, so an unsupported
    /// target leaves nothing behind.
    pub fn encode(grid: &PixelGrid, format: &FormatTag, path: &Path) -> Result<()> {
        let container = format.container().ok_or_else(|| {
            DiffError::encode(
                path,
                CodecError::Unsupported(format!("output format {:?}", format.extension())),
            )
        })?;

        if container == Container::Tiff && grid.model() == ColorModel::Cmyk {
            encode_cmyk_tiff(grid, path)?;
        } else {
            let image = to_dynamic(grid).ok_or_else(|| {
                DiffError::encode(path, CodecError::Unsupported(format!("{} grids", grid.model())))
            })?;
            let image = match container {
                Container::Jpeg => jpeg_compatible(image),
                _ => image,
            };
            let file = File::create(path).map_err(|e| DiffError::encode(path, e))?;
            let mut writer = BufWriter::new(file);
            image
                .write_to(&mut writer, container.image_format())
                .map_err(|e| DiffError::encode(path, e))?;
            writer.flush().map_err(|e| DiffError::encode(path, e))?;
        }
        info!("wrote {} ({} {})", path.display(), grid.dimensions(), grid.model());
        Ok(())
    }

    fn encode_cmyk_tiff(grid: &PixelGrid, path: &Path) -> Result<()> {
        let Samples::Eight(data) = grid.samples() else {
            return Err(DiffError::encode(
                path,
                CodecError::Unsupported("16-bit CMYK".to_string()),
            ));
        };
        let file = File::create(path).map_err(|e| DiffError::encode(path, e))?;
        let mut encoder =
            TiffEncoder::new(BufWriter::new(file)).map_err(|e| DiffError::encode(path, e))?;
        encoder
            .write_image::<colortype::CMYK8>(grid.width(), grid.height(), data)
            .map_err(|e| DiffError::encode(path, e))?;
        Ok(())
    }
}
