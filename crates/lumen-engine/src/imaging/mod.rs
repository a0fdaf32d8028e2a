//! Image decode pipeline.
//!
//! Turns an externally selected image (the platform picker, a dropped file,
//! a launch argument) into a [`PendingImage`]: tightly packed RGBA8, the one
//! format engines receive regardless of the source encoding. Decoding runs on
//! short-lived helper threads and never touches the engine.

mod decode;
mod pipeline;

pub use decode::{decode_image, DecodeError, ImageSource, PendingImage, PixelFormat};
pub use pipeline::{ImagePipeline, ImageSink};
