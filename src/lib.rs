// THEORY:
// This file is the main entry point for the `image_differ` library crate.
// It exposes `DiffEngine` and the free `compute_diff` / `compute_transform`
// functions as the high-level interface, plus the batch runner used by the
// command-line front end. The building blocks (grid, partitioner, worker
// pool, dispatcher, algorithms, output grid, codecs) live in `core_modules`
// and are public so callers can assemble their own flows.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{EngineConfig, WorkerCount};
pub use core_modules::color_model::ColorModel;
pub use core_modules::pixel_grid::{Dimensions, PixelGrid, Samples};
pub use error::{CodecError, DiffError, Result};
pub use pipeline::{DiffEngine, compute_diff, compute_transform};
