pub mod image_helper;

pub use image_helper::image_helper::{
    Container, FormatTag, decode, encode, from_dynamic, output_path, to_dynamic,
};
