mod mock;
mod nokhwa_capture;

pub use mock::MockCapture;
pub use nokhwa_capture::WebcamCapture;

use crate::error::CaptureError;
use crate::frame::Frame;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single frame in the device's native geometry and channel order
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Index the device was opened with
    fn device_index(&self) -> u32;

    /// Get the resolution the device negotiated
    fn resolution(&self) -> (u32, u32);

    /// Stop capturing and give the device back
    fn release(&mut self) {}
}
