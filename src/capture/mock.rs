use super::CaptureSource;
use crate::error::CaptureError;
use crate::frame::Frame;
use nokhwa::NokhwaError;
use std::collections::VecDeque;

/// Scripted capture source for running the streamer without hardware.
///
/// Reads are answered from a queue of frames and failures. Once the script
/// runs out every further read fails, like a camera that was unplugged.
pub struct MockCapture {
    index: u32,
    resolution: (u32, u32),
    script: VecDeque<Result<Frame, String>>,
    reads: usize,
    released: bool,
}

impl MockCapture {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            resolution: (0, 0),
            script: VecDeque::new(),
            reads: 0,
            released: false,
        }
    }

    pub fn push_frame(&mut self, frame: Frame) -> &mut Self {
        if self.resolution == (0, 0) {
            self.resolution = frame.dimensions();
        }
        self.script.push_back(Ok(frame));
        self
    }

    pub fn push_frames(&mut self, frame: &Frame, count: usize) -> &mut Self {
        for _ in 0..count {
            self.push_frame(frame.clone());
        }
        self
    }

    pub fn push_failures(&mut self, count: usize) -> &mut Self {
        for n in 0..count {
            self.script.push_back(Err(format!("scripted failure {}", n + 1)));
        }
        self
    }

    /// Number of `read_frame` calls so far, warm-up included.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl CaptureSource for MockCapture {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        self.reads += 1;
        match self.script.pop_front() {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(reason)) => Err(CaptureError::Read {
                context: "scripted read failure",
                source: NokhwaError::ReadFrameError(reason),
            }),
            None => Err(CaptureError::Read {
                context: "mock camera exhausted",
                source: NokhwaError::ReadFrameError("no frames left".to_string()),
            }),
        }
    }

    fn device_index(&self) -> u32 {
        self.index
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn release(&mut self) {
        self.released = true;
    }
}
