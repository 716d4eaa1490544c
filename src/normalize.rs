use crate::error::{CaptureError, StreamError};
use crate::frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};
use image::{imageops, RgbImage};

/// Normalizer for turning captured frames into fixed-size RGB output
pub struct Normalizer {
    target_width: u32,
    target_height: u32,
    filter: imageops::FilterType,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(FRAME_WIDTH, FRAME_HEIGHT)
    }
}

impl Normalizer {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            filter: imageops::FilterType::Triangle,
        }
    }

    /// Normalize a captured frame into an RGB image of the target size
    ///
    /// Steps:
    /// 1. Resize to target dimensions if the device ignored the request
    /// 2. Reorder channels from the device's order to RGB
    ///
    /// Resizing works per channel, so it is done before the reorder without
    /// caring which order the bytes are in.
    pub fn normalize(&self, frame: Frame) -> Result<RgbImage, StreamError> {
        let _span = tracing::debug_span!("normalize").entered();

        let (width, height) = frame.dimensions();
        let order = frame.order();
        let len = frame.data().len();
        let captured = RgbImage::from_raw(width, height, frame.into_raw())
            .ok_or(CaptureError::Malformed { width, height, len })?;

        // Resize if needed
        let mut image = if (width, height) != (self.target_width, self.target_height) {
            tracing::debug!(
                "Resizing {}x{} frame to {}x{}",
                width,
                height,
                self.target_width,
                self.target_height
            );
            imageops::resize(
                &captured,
                self.target_width,
                self.target_height,
                self.filter,
            )
        } else {
            captured
        };

        order.to_rgb(&mut image);

        Ok(image)
    }
}
