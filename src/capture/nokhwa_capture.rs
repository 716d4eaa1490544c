use super::CaptureSource;
use crate::error::CaptureError;
use crate::frame::{ChannelOrder, Frame, FRAME_HEIGHT, FRAME_WIDTH, TARGET_FPS};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::{Camera, NokhwaError};

/// Frame formats nokhwa decodes to RGB, cheapest to decode first.
const DECODABLE_FORMATS: [FrameFormat; 5] = [
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::RAWRGB,
    FrameFormat::MJPEG,
    FrameFormat::GRAY,
];

pub struct WebcamCapture {
    camera: Camera,
    index: u32,
    streaming: bool,
}

impl WebcamCapture {
    /// Open camera `device_index` and start streaming.
    ///
    /// Asks for 320x240 at 10 fps. A device without that mode is opened in
    /// the nearest mode it lists and its frames get resized later.
    pub fn open(device_index: u32) -> Result<Self, CaptureError> {
        let backend = preferred_backend();
        tracing::info!(
            "Initializing webcam {} via {:?} backend, requesting {}x{} @ {} fps",
            device_index,
            backend,
            FRAME_WIDTH,
            FRAME_HEIGHT,
            TARGET_FPS
        );

        request_permission(device_index)?;

        let open_error = |context: &'static str| {
            move |source: NokhwaError| CaptureError::Open {
                index: device_index,
                context,
                source,
            }
        };

        let mut camera = open_best_effort(device_index, backend)
            .map_err(open_error("failed to open camera"))?;

        camera
            .open_stream()
            .map_err(open_error("failed to open camera stream"))?;

        let negotiated = camera.camera_format();
        tracing::info!(
            "Webcam {} streaming {:?} at {}x{} @ {} fps",
            device_index,
            negotiated.format(),
            negotiated.width(),
            negotiated.height(),
            negotiated.frame_rate()
        );

        Ok(Self {
            camera,
            index: device_index,
            streaming: true,
        })
    }
}

/// macOS drivers are ambiguous under automatic selection, so pin AVFoundation there.
fn preferred_backend() -> ApiBackend {
    if cfg!(target_os = "macos") {
        ApiBackend::AVFoundation
    } else {
        ApiBackend::Auto
    }
}

/// AVFoundation refuses to open anything until the user has granted access.
#[cfg(target_os = "macos")]
fn request_permission(index: u32) -> Result<(), CaptureError> {
    use std::sync::mpsc;
    use std::time::Duration;

    const PERMISSION_TIMEOUT: Duration = Duration::from_secs(30);

    let (granted_tx, granted_rx) = mpsc::channel();
    nokhwa::nokhwa_initialize(move |granted| {
        let _ = granted_tx.send(granted);
    });

    access_granted(index, granted_rx.recv_timeout(PERMISSION_TIMEOUT))
}

/// Anything but an explicit grant counts as denied.
#[cfg(any(target_os = "macos", test))]
fn access_granted(
    index: u32,
    answer: Result<bool, std::sync::mpsc::RecvTimeoutError>,
) -> Result<(), CaptureError> {
    match answer {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(CaptureError::PermissionDenied { index }),
    }
}

#[cfg(not(target_os = "macos"))]
fn request_permission(_index: u32) -> Result<(), CaptureError> {
    Ok(())
}

fn open_camera(
    index: u32,
    backend: ApiBackend,
    request: RequestedFormatType,
) -> Result<Camera, NokhwaError> {
    let requested = RequestedFormat::new::<RgbFormat>(request);
    Camera::with_backend(CameraIndex::Index(index), requested, backend)
}

/// Open with the wanted mode if the device has it. Otherwise open with the
/// driver's first mode and move to the nearest mode from its list.
fn open_best_effort(index: u32, backend: ApiBackend) -> Result<Camera, NokhwaError> {
    let wanted = CameraFormat::new(
        Resolution::new(FRAME_WIDTH, FRAME_HEIGHT),
        FrameFormat::YUYV,
        TARGET_FPS,
    );
    match open_camera(index, backend, RequestedFormatType::Closest(wanted)) {
        Ok(camera) => return Ok(camera),
        Err(err) => tracing::debug!("Camera {} has no {}: {}", index, wanted, err),
    }

    let mut camera = open_camera(index, backend, RequestedFormatType::None)?;
    let formats = match camera.compatible_camera_formats() {
        Ok(formats) => formats,
        Err(err) => {
            tracing::debug!("Cannot list formats of camera {}: {}", index, err);
            return Ok(camera);
        }
    };

    let nearest = match nearest_format(&formats) {
        Some(format) if format != camera.camera_format() => format,
        _ => return Ok(camera),
    };

    tracing::debug!("Switching camera {} to nearest mode {}", index, nearest);
    drop(camera);
    match open_camera(index, backend, RequestedFormatType::Exact(nearest)) {
        Ok(camera) => Ok(camera),
        Err(err) => {
            tracing::debug!("Camera {} rejected {}: {}", index, nearest, err);
            open_camera(index, backend, RequestedFormatType::None)
        }
    }
}

/// Pick the mode closest to 320x240 @ 10 fps among those we can decode.
///
/// Exact resolution first, then modes at least as large as the target (so
/// frames get scaled down rather than up), then nearest pixel count, then
/// nearest frame rate at or above the target, then cheapest decode.
pub(crate) fn nearest_format(available: &[CameraFormat]) -> Option<CameraFormat> {
    let target_area = u64::from(FRAME_WIDTH) * u64::from(FRAME_HEIGHT);

    available
        .iter()
        .filter_map(|format| {
            DECODABLE_FORMATS
                .iter()
                .position(|decodable| *decodable == format.format())
                .map(|rank| (*format, rank))
        })
        .min_by_key(|(format, rank)| {
            let (width, height) = (format.width(), format.height());
            let fps = format.frame_rate();
            (
                (width, height) != (FRAME_WIDTH, FRAME_HEIGHT),
                width < FRAME_WIDTH || height < FRAME_HEIGHT,
                (u64::from(width) * u64::from(height)).abs_diff(target_area),
                fps < TARGET_FPS,
                fps.abs_diff(TARGET_FPS),
                *rank,
            )
        })
        .map(|(format, _)| format)
}

impl CaptureSource for WebcamCapture {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|source| CaptureError::Read {
                context: "failed to capture frame",
                source,
            })?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|source| CaptureError::Read {
                context: "failed to decode frame",
                source,
            })?;

        let (width, height) = decoded.dimensions();
        Frame::new(width, height, ChannelOrder::Rgb, decoded.into_raw())
    }

    fn device_index(&self) -> u32 {
        self.index
    }

    fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }

    fn release(&mut self) {
        if !self.streaming {
            return;
        }
        self.streaming = false;

        match self.camera.stop_stream() {
            Ok(()) => tracing::info!("Webcam {} released", self.index),
            Err(err) => tracing::warn!("Failed to stop webcam {} cleanly: {}", self.index, err),
        }
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(format: FrameFormat, width: u32, height: u32, fps: u32) -> CameraFormat {
        CameraFormat::new(Resolution::new(width, height), format, fps)
    }

    #[test]
    fn mjpeg_only_camera_still_gets_a_mode() {
        let formats = [
            mode(FrameFormat::MJPEG, 1280, 720, 30),
            mode(FrameFormat::MJPEG, 320, 240, 30),
            mode(FrameFormat::MJPEG, 640, 480, 30),
        ];
        assert_eq!(
            nearest_format(&formats),
            Some(mode(FrameFormat::MJPEG, 320, 240, 30))
        );
    }

    #[test]
    fn camera_without_target_resolution_gets_nearest_larger_mode() {
        let formats = [
            mode(FrameFormat::YUYV, 1280, 720, 10),
            mode(FrameFormat::YUYV, 640, 480, 30),
        ];
        assert_eq!(
            nearest_format(&formats),
            Some(mode(FrameFormat::YUYV, 640, 480, 30))
        );
    }

    #[test]
    fn downscaling_beats_upscaling() {
        let formats = [
            mode(FrameFormat::YUYV, 256, 192, 10),
            mode(FrameFormat::YUYV, 640, 480, 10),
        ];
        assert_eq!(
            nearest_format(&formats),
            Some(mode(FrameFormat::YUYV, 640, 480, 10))
        );
    }

    #[test]
    fn frame_rate_nearest_target_wins_at_same_resolution() {
        let formats = [
            mode(FrameFormat::YUYV, 320, 240, 5),
            mode(FrameFormat::YUYV, 320, 240, 30),
            mode(FrameFormat::YUYV, 320, 240, 15),
        ];
        assert_eq!(
            nearest_format(&formats),
            Some(mode(FrameFormat::YUYV, 320, 240, 15))
        );
    }

    #[test]
    fn cheaper_decode_breaks_ties() {
        let formats = [
            mode(FrameFormat::MJPEG, 320, 240, 10),
            mode(FrameFormat::YUYV, 320, 240, 10),
        ];
        assert_eq!(
            nearest_format(&formats),
            Some(mode(FrameFormat::YUYV, 320, 240, 10))
        );
    }

    #[test]
    fn no_modes_means_no_choice() {
        assert_eq!(nearest_format(&[]), None);
    }

    #[test]
    fn only_an_explicit_grant_opens_the_camera() {
        use std::sync::mpsc::RecvTimeoutError;

        assert!(access_granted(0, Ok(true)).is_ok());
        assert!(matches!(
            access_granted(1, Ok(false)),
            Err(CaptureError::PermissionDenied { index: 1 })
        ));
        assert!(matches!(
            access_granted(2, Err(RecvTimeoutError::Timeout)),
            Err(CaptureError::PermissionDenied { index: 2 })
        ));
    }
}
