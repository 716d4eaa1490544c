//! Stream a local camera to stdout as raw RGB24 frames.
//!
//! Every frame written is exactly 320x240 pixels, 3 bytes per pixel, row-major,
//! with no header or delimiter. Human-readable status lines (`READY:`, `WARN:`,
//! `ERROR:`) go to stderr so stdout stays a clean byte stream.

pub mod capture;
pub mod error;
pub mod failure;
pub mod frame;
pub mod normalize;
pub mod output;
pub mod status;
pub mod streamer;

pub use capture::{CaptureSource, MockCapture, WebcamCapture};
pub use error::{CaptureError, StreamError};
pub use failure::{FailureCounter, FailurePolicy, FailureVerdict};
pub use frame::{ChannelOrder, Frame, FRAME_BYTES, FRAME_HEIGHT, FRAME_WIDTH};
pub use normalize::Normalizer;
pub use output::{OutputSink, RawFrameWriter};
pub use status::StatusReporter;
pub use streamer::{stream_camera, FrameStreamer, StreamOutcome, StreamerConfig};
