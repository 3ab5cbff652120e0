//! perceptd - single-camera perception daemon.
//!
//! Opens the given capture device, runs the inference pipeline at the
//! configured frame interval, and republishes annotated frames as an MJPEG
//! stream. Runs until externally killed; under `--debug`, Ctrl+C requests a
//! clean stop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use percept::{infer, CameraSource, MjpegStreamer, PerceptConfig, Pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "perceptd",
    about = "Single-camera perception daemon",
    long_about = "Single-camera perception daemon.\n\n\
        DEVICE is the capture device identifier: the webcam index reported by\n\
        `v4l2-ctl --list-devices` (e.g. 0 for /dev/video0), a device path, or\n\
        a stub:// URL for the synthetic source."
)]
struct Cli {
    /// Capture device identifier (webcam index, device path, or stub:// URL)
    device: String,

    /// Verbose logging and interactive stop via Ctrl+C
    #[arg(long)]
    debug: bool,

    /// Config file path (JSON); overrides PERCEPT_CONFIG
    #[arg(long, env = "PERCEPT_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    if cli.debug {
        log::info!("debug mode enabled");
    }

    let mut config = PerceptConfig::load_from(cli.config.as_deref())?;
    config.capture.device = cli.device;

    let streamer = MjpegStreamer::start(&config.stream.addr).context("start mjpeg streamer")?;

    let source = CameraSource::open(&config.capture).context("open capture source")?;
    let backend = infer::open_backend(&config.model).context("open inference backend")?;

    let mut pipeline =
        Pipeline::new(&config, source, backend, streamer)?.with_debug(cli.debug);

    // Interactive stop exists only in debug mode; the default mode runs
    // until externally killed.
    if cli.debug {
        let stop = Arc::new(AtomicBool::new(false));
        let handler_stop = stop.clone();
        ctrlc::set_handler(move || {
            handler_stop.store(true, Ordering::SeqCst);
        })
        .context("install Ctrl+C handler")?;
        pipeline = pipeline.with_stop_flag(stop);
    }

    log::info!(
        "perceptd running: interval={}ms stream={}{}",
        config.interval.as_millis(),
        config.stream.addr,
        config.stream.channel
    );
    pipeline.run()
}
