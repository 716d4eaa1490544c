//! Line protocol on stderr.
//!
//! A parent process synchronizes on these lines instead of parsing stdout:
//!
//! - `READY: Camera <id> opened at <width>x<height>`, once, after a successful open
//! - `WARN: Camera read failed`, rate limited
//! - `ERROR: <reason>`, at most once, right before a non-zero exit
//!
//! Every line is flushed immediately.

use std::fmt;
use std::io::{self, Stderr, Write};

pub struct StatusReporter<W: Write> {
    writer: W,
}

impl StatusReporter<Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> StatusReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn ready(&mut self, camera_index: u32, width: u32, height: u32) {
        self.line(format_args!(
            "READY: Camera {} opened at {}x{}",
            camera_index, width, height
        ));
    }

    pub fn read_failed(&mut self) {
        self.line(format_args!("WARN: Camera read failed"));
    }

    pub fn fatal(&mut self, reason: impl fmt::Display) {
        self.line(format_args!("ERROR: {}", reason));
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        let result = self
            .writer
            .write_fmt(args)
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush());

        // Nowhere left to report this except the debug log
        if let Err(err) = result {
            tracing::debug!("Failed to write status line: {}", err);
        }
    }
}
