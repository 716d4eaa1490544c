mod raw_stream;

pub use raw_stream::RawFrameWriter;

use crate::error::StreamError;
use image::RgbImage;

/// Trait for output destinations
pub trait OutputSink {
    /// Write a frame to the output
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), StreamError>;

    /// Get the expected output resolution
    fn resolution(&self) -> (u32, u32);
}
