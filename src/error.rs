use std::path::PathBuf;

use thiserror::Error;

use crate::core_modules::color_model::ColorModel;
use crate::core_modules::pixel_grid::Dimensions;

pub type Result<T> = std::result::Result<T, DiffError>;

/// Failures raised by the underlying codecs.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Tiff(#[from] tiff::TiffError),
    #[error("unsupported image layout: {0}")]
    Unsupported(String),
}

/// Every way a single diff or transform invocation can fail.
///
/// All variants are terminal for the invocation that raised them.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error("image dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: Dimensions, right: Dimensions },
    #[error("color models differ: {left} vs {right}")]
    ColorModelMismatch { left: ColorModel, right: ColorModel },
    #[error("unsupported color model: {0}")]
    UnsupportedColorModel(ColorModel),
    #[error("{model} grid of {dimensions} expects {expected} samples, got {actual}")]
    MalformedGrid {
        model: ColorModel,
        dimensions: Dimensions,
        expected: usize,
        actual: usize,
    },
    #[error("{model} grid requires {expected}-bit samples")]
    SampleDepth { model: ColorModel, expected: u8 },
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("job aborted: {0}")]
    JobAborted(#[from] tokio::task::JoinError),
    #[error("batch scheduler closed: {0}")]
    SchedulerClosed(#[from] tokio::sync::AcquireError),
}

impl DiffError {
    pub(crate) fn decode(path: impl Into<PathBuf>, source: impl Into<CodecError>) -> Self {
        DiffError::Decode {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn encode(path: impl Into<PathBuf>, source: impl Into<CodecError>) -> Self {
        DiffError::Encode {
            path: path.into(),
            source: source.into(),
        }
    }
}
