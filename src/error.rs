use nokhwa::NokhwaError;
use std::io;
use thiserror::Error;

/// Failures coming from the capture device.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("could not open camera {index}: {context}")]
    Open {
        index: u32,
        context: &'static str,
        #[source]
        source: NokhwaError,
    },

    #[error("camera {index} access was not granted")]
    PermissionDenied { index: u32 },

    #[error("{context}")]
    Read {
        context: &'static str,
        #[source]
        source: NokhwaError,
    },

    #[error("malformed frame: {width}x{height} with {len} bytes")]
    Malformed { width: u32, height: u32, len: usize },
}

impl CaptureError {
    /// Message with its whole cause chain, for logging.
    pub fn report(self) -> String {
        format!("{:#}", anyhow::Error::new(self))
    }
}

/// Failures on the way from a captured frame to stdout.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("frame is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    Geometry {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error(transparent)]
    Frame(#[from] CaptureError),

    #[error("failed to write frame: {0}")]
    Write(#[from] io::Error),
}

impl StreamError {
    /// The reading side of stdout went away.
    pub fn is_consumer_closed(&self) -> bool {
        matches!(self, StreamError::Write(err) if err.kind() == io::ErrorKind::BrokenPipe)
    }
}
