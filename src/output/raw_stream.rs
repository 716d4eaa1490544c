use super::OutputSink;
use crate::error::StreamError;
use crate::frame::{FRAME_HEIGHT, FRAME_WIDTH};
use image::RgbImage;
use std::io::{self, StdoutLock, Write};

/// Writes frames as bare RGB24 bytes: no header, no delimiter, no length prefix.
///
/// Each frame is flushed as soon as it is written so a reader on the other
/// end of the pipe sees whole frames as they arrive.
pub struct RawFrameWriter<W: Write> {
    writer: W,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl RawFrameWriter<StdoutLock<'static>> {
    /// Stream 320x240 frames to this process's stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout().lock(), FRAME_WIDTH, FRAME_HEIGHT)
    }
}

impl<W: Write> RawFrameWriter<W> {
    pub fn new(writer: W, width: u32, height: u32) -> Self {
        Self {
            writer,
            width,
            height,
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for RawFrameWriter<W> {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), StreamError> {
        let (width, height) = frame.dimensions();
        if (width, height) != (self.width, self.height) {
            return Err(StreamError::Geometry {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: width,
                actual_height: height,
            });
        }

        self.writer.write_all(frame.as_raw())?;
        self.writer.flush()?;
        self.frames_written += 1;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FRAME_BYTES;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_raw_bytes_back_to_back() {
        let mut sink = RawFrameWriter::new(Vec::new(), 320, 240);
        let first = RgbImage::from_pixel(320, 240, image::Rgb([1, 2, 3]));
        let second = RgbImage::from_pixel(320, 240, image::Rgb([4, 5, 6]));

        sink.write_frame(&first).unwrap();
        sink.write_frame(&second).unwrap();
        assert_eq!(sink.frames_written(), 2);

        let bytes = sink.into_inner();
        assert_eq!(bytes.len(), 2 * FRAME_BYTES);
        assert_eq!(&bytes[..3], &[1, 2, 3]);
        assert_eq!(&bytes[FRAME_BYTES..FRAME_BYTES + 3], &[4, 5, 6]);
    }

    #[test]
    fn refuses_wrong_geometry() {
        let mut sink = RawFrameWriter::new(Vec::new(), 320, 240);
        let frame = RgbImage::new(640, 480);

        let err = sink.write_frame(&frame).unwrap_err();
        assert!(matches!(err, StreamError::Geometry { actual_width: 640, .. }));
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn broken_pipe_is_reported_as_consumer_closed() {
        let mut sink = RawFrameWriter::new(ClosedPipe, 320, 240);
        let err = sink.write_frame(&RgbImage::new(320, 240)).unwrap_err();
        assert!(err.is_consumer_closed());
    }
}
