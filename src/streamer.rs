use crate::capture::CaptureSource;
use crate::error::CaptureError;
use crate::failure::{
    FailureCounter, FailurePolicy, MAX_CONSECUTIVE_FAILURES, RETRY_DELAY, WARN_INTERVAL,
};
use crate::normalize::Normalizer;
use crate::output::OutputSink;
use crate::status::StatusReporter;
use std::io::Write;
use std::time::{Duration, Instant};

/// Frames discarded after opening so auto exposure and white balance can settle.
pub const WARMUP_FRAMES: usize = 5;
pub const WARMUP_DELAY: Duration = Duration::from_millis(50);
/// Frames between debug timing reports.
const STATS_INTERVAL: u64 = 30;

/// Timing and retry knobs for a stream. Fixed at build time for the binary.
#[derive(Clone, Debug)]
pub struct StreamerConfig {
    pub policy: FailurePolicy,
    pub max_consecutive_failures: u32,
    pub warn_interval: Duration,
    pub retry_delay: Duration,
    pub warmup_frames: usize,
    pub warmup_delay: Duration,
}

impl StreamerConfig {
    pub fn for_policy(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::Resilient => Self::resilient(),
            FailurePolicy::Simple => Self::simple(),
        }
    }

    pub fn resilient() -> Self {
        Self {
            policy: FailurePolicy::Resilient,
            max_consecutive_failures: MAX_CONSECUTIVE_FAILURES,
            warn_interval: WARN_INTERVAL,
            retry_delay: RETRY_DELAY,
            warmup_frames: WARMUP_FRAMES,
            warmup_delay: WARMUP_DELAY,
        }
    }

    /// No warm-up, no retries.
    pub fn simple() -> Self {
        Self {
            policy: FailurePolicy::Simple,
            warmup_frames: 0,
            ..Self::resilient()
        }
    }
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self::resilient()
    }
}

/// Why the stream stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The device stopped delivering frames (simple policy).
    EndOfStream,
    /// Whoever was reading stdout went away.
    ConsumerClosed,
    OpenFailed,
    /// Too many consecutive read failures (resilient policy).
    FailureBudgetExhausted,
    OutputFailed,
}

impl StreamOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            StreamOutcome::EndOfStream | StreamOutcome::ConsumerClosed => 0,
            StreamOutcome::OpenFailed
            | StreamOutcome::FailureBudgetExhausted
            | StreamOutcome::OutputFailed => 1,
        }
    }
}

/// Open camera `camera_index` with `open` and stream it into `output`.
///
/// An open failure is reported on `status` and nothing is written to `output`.
pub fn stream_camera<C, F, O, W>(
    camera_index: u32,
    open: F,
    output: O,
    mut status: StatusReporter<W>,
    config: StreamerConfig,
) -> StreamOutcome
where
    C: CaptureSource,
    F: FnOnce(u32) -> Result<C, CaptureError>,
    O: OutputSink,
    W: Write,
{
    match open(camera_index) {
        Ok(capture) => FrameStreamer::new(capture, output, status, config).run(),
        Err(err) => {
            tracing::error!("{}", err.report());
            status.fatal(format_args!("Could not open camera {}", camera_index));
            StreamOutcome::OpenFailed
        }
    }
}

#[derive(Default)]
struct FrameStats {
    frames: u64,
    capture: Duration,
    normalize: Duration,
    output: Duration,
}

impl FrameStats {
    fn report(&self) {
        let per_frame = |total: Duration| total.as_secs_f64() * 1000.0 / self.frames as f64;
        let capture_ms = per_frame(self.capture);
        let normalize_ms = per_frame(self.normalize);
        let output_ms = per_frame(self.output);
        let total_ms = capture_ms + normalize_ms + output_ms;

        tracing::debug!(
            "Frame {}: capture={:.1}ms, normalize={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}",
            self.frames,
            capture_ms,
            normalize_ms,
            output_ms,
            total_ms,
            1000.0 / total_ms
        );
    }
}

/// Owns an open camera and pumps normalized frames into an output until the
/// camera or the output gives out.
pub struct FrameStreamer<C, O, W>
where
    C: CaptureSource,
    O: OutputSink,
    W: Write,
{
    capture: C,
    output: O,
    status: StatusReporter<W>,
    normalizer: Normalizer,
    failures: FailureCounter,
    config: StreamerConfig,
}

impl<C, O, W> FrameStreamer<C, O, W>
where
    C: CaptureSource,
    O: OutputSink,
    W: Write,
{
    pub fn new(capture: C, output: O, status: StatusReporter<W>, config: StreamerConfig) -> Self {
        let (width, height) = output.resolution();
        Self {
            capture,
            output,
            status,
            normalizer: Normalizer::new(width, height),
            failures: FailureCounter::new(config.max_consecutive_failures, config.warn_interval),
            config,
        }
    }

    /// Announce readiness, warm up, stream until done, then release the camera.
    pub fn run(&mut self) -> StreamOutcome {
        let (width, height) = self.output.resolution();
        self.status.ready(self.capture.device_index(), width, height);

        let (device_width, device_height) = self.capture.resolution();
        tracing::info!(
            "Camera {} delivering {}x{}, streaming {}x{} RGB24 ({:?} policy)",
            self.capture.device_index(),
            device_width,
            device_height,
            width,
            height,
            self.config.policy
        );

        self.warm_up();
        let outcome = self.pump();
        self.capture.release();

        tracing::info!("Stream stopped: {:?}", outcome);
        outcome
    }

    pub fn into_parts(self) -> (C, O, StatusReporter<W>) {
        (self.capture, self.output, self.status)
    }

    fn warm_up(&mut self) {
        if self.config.warmup_frames == 0 {
            return;
        }

        tracing::debug!("Discarding {} warm-up frames", self.config.warmup_frames);
        for _ in 0..self.config.warmup_frames {
            if let Err(err) = self.capture.read_frame() {
                tracing::debug!("Warm-up read failed: {}", err.report());
            }
            sleep(self.config.warmup_delay);
        }
    }

    fn pump(&mut self) -> StreamOutcome {
        let mut stats = FrameStats::default();

        loop {
            let capture_start = Instant::now();
            let frame = match self.capture.read_frame() {
                Ok(frame) => frame,
                Err(err) => match self.on_read_failure(err) {
                    Some(outcome) => return outcome,
                    None => continue,
                },
            };
            self.failures.record_success();
            stats.capture += capture_start.elapsed();

            let normalize_start = Instant::now();
            let normalized = self.normalizer.normalize(frame);
            stats.normalize += normalize_start.elapsed();

            let output_start = Instant::now();
            let written = normalized.and_then(|image| self.output.write_frame(&image));
            stats.output += output_start.elapsed();

            if let Err(err) = written {
                if err.is_consumer_closed() {
                    tracing::info!("Output closed by reader");
                    return StreamOutcome::ConsumerClosed;
                }
                tracing::error!("{}", err);
                self.status.fatal(&err);
                return StreamOutcome::OutputFailed;
            }

            stats.frames += 1;
            if stats.frames % STATS_INTERVAL == 0 {
                stats.report();
            }
        }
    }

    /// Returns the outcome if the stream has to stop, `None` to retry.
    fn on_read_failure(&mut self, err: CaptureError) -> Option<StreamOutcome> {
        match self.config.policy {
            FailurePolicy::Simple => {
                tracing::debug!("{}, ending stream", err.report());
                Some(StreamOutcome::EndOfStream)
            }
            FailurePolicy::Resilient => {
                let verdict = self.failures.record_failure(Instant::now());
                tracing::debug!(
                    "{} ({} consecutive)",
                    err.report(),
                    self.failures.consecutive()
                );

                if verdict.warn {
                    self.status.read_failed();
                }
                if verdict.exhausted {
                    self.status.fatal("Too many capture failures, stopping camera");
                    return Some(StreamOutcome::FailureBudgetExhausted);
                }

                sleep(self.config.retry_delay);
                None
            }
        }
    }
}

fn sleep(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(StreamOutcome::EndOfStream.exit_code(), 0);
        assert_eq!(StreamOutcome::ConsumerClosed.exit_code(), 0);
        assert_eq!(StreamOutcome::OpenFailed.exit_code(), 1);
        assert_eq!(StreamOutcome::FailureBudgetExhausted.exit_code(), 1);
        assert_eq!(StreamOutcome::OutputFailed.exit_code(), 1);
    }

    #[test]
    fn simple_config_skips_warm_up() {
        let config = StreamerConfig::for_policy(FailurePolicy::Simple);
        assert_eq!(config.warmup_frames, 0);
        assert_eq!(config.policy, FailurePolicy::Simple);
    }

    #[test]
    fn resilient_config_uses_build_constants() {
        let config = StreamerConfig::default();
        assert_eq!(config.max_consecutive_failures, 50);
        assert_eq!(config.warn_interval, Duration::from_secs(2));
        assert_eq!(config.retry_delay, Duration::from_millis(50));
        assert_eq!(config.warmup_frames, 5);
    }
}
