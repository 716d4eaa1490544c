use camera_helper::{
    stream_camera, FailurePolicy, RawFrameWriter, StatusReporter, StreamerConfig, WebcamCapture,
};
use clap::Parser;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;

/// Stream a camera to stdout as raw 320x240 RGB24 frames
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera device index
    #[arg(default_value_t = 0)]
    camera: u32,

    /// How to react to failed reads
    #[arg(long, value_enum, default_value_t = FailurePolicy::Resilient)]
    mode: FailurePolicy,

    /// Enable debug logging on stderr
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging. Stdout carries frames only, and without --debug
    // stderr carries only the READY/WARN/ERROR lines.
    let log_level = if args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::OFF
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("camera-helper starting");
    tracing::info!("Camera index: {}", args.camera);
    tracing::info!("Failure policy: {:?}", args.mode);

    let outcome = stream_camera(
        args.camera,
        WebcamCapture::open,
        RawFrameWriter::stdout(),
        StatusReporter::stderr(),
        StreamerConfig::for_policy(args.mode),
    );

    ExitCode::from(outcome.exit_code())
}
