use crate::error::CaptureError;

/// Output frame width in pixels.
pub const FRAME_WIDTH: u32 = 320;
/// Output frame height in pixels.
pub const FRAME_HEIGHT: u32 = 240;
pub const BYTES_PER_PIXEL: usize = 3;
/// Size of one RGB24 frame on stdout.
pub const FRAME_BYTES: usize = FRAME_WIDTH as usize * FRAME_HEIGHT as usize * BYTES_PER_PIXEL;
/// Frame rate requested from the device. Best effort only.
pub const TARGET_FPS: u32 = 10;

/// Component order of the interleaved pixels a device hands us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Permute `pixels` in place from this order to RGB.
    pub fn to_rgb(self, pixels: &mut [u8]) {
        match self {
            ChannelOrder::Rgb => {}
            ChannelOrder::Bgr => swap_red_blue(pixels),
        }
    }
}

/// Swap the first and third byte of every pixel.
///
/// This is its own inverse, so it maps BGR to RGB and back.
pub fn swap_red_blue(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        pixel.swap(0, 2);
    }
}

/// A captured frame in the device's native geometry and channel order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap interleaved 3-byte pixels. The buffer must hold exactly
    /// `width * height * 3` bytes and both dimensions must be non-zero.
    pub fn new(
        width: u32,
        height: u32,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self, CaptureError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL));

        match expected {
            Some(len) if len > 0 && len == data.len() => Ok(Self {
                width,
                height,
                order,
                data,
            }),
            _ => Err(CaptureError::Malformed {
                width,
                height,
                len: data.len(),
            }),
        }
    }

    /// A frame with every pixel set to `pixel`, given in `order`.
    pub fn filled(
        width: u32,
        height: u32,
        order: ChannelOrder,
        pixel: [u8; 3],
    ) -> Result<Self, CaptureError> {
        let count = (width as usize)
            .checked_mul(height as usize)
            .ok_or(CaptureError::Malformed {
                width,
                height,
                len: 0,
            })?;
        Self::new(width, height, order, pixel.repeat(count))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}
