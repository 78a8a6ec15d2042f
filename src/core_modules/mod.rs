pub mod algorithms;
pub mod color_model;
pub mod dispatcher;
pub mod output_grid;
pub mod parallel_processor;
pub mod partitioner;
pub mod pixel_grid;
pub mod utils;
