//! Pipeline driver.
//!
//! One logical thread runs every stage in strict sequence each cycle:
//! begin_cycle -> capture -> resize_and_crop -> extract_features -> infer ->
//! render -> wait_until(deadline) -> publish_if_alive. There is no internal
//! parallelism; the only concurrent actor is the publisher's own accept
//! thread, which the pipeline never waits on.
//!
//! Error policy (see the per-arm comments in `run_cycle`): capture and
//! inference failures are fatal, an unavailable publisher is not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use crate::capture::CameraSource;
use crate::config::PerceptConfig;
use crate::features::{extract_features, FeatureBuffer};
use crate::infer::{InferenceBackend, ModelCapability};
use crate::pacing::PacingController;
use crate::preprocess::{crop_region, resize_and_crop, TargetSize};
use crate::render::{render_result, RenderReport};
use crate::stream::FramePublisher;

pub struct Pipeline<P: FramePublisher> {
    source: CameraSource,
    backend: Box<dyn InferenceBackend>,
    publisher: P,
    pacing: PacingController,
    features: FeatureBuffer,
    target: TargetSize,
    channel: String,
    jpeg_quality: u8,
    debug: bool,
    stop: Option<Arc<AtomicBool>>,
    cycle_count: u64,
}

impl<P: FramePublisher> Pipeline<P> {
    pub fn new(
        config: &PerceptConfig,
        source: CameraSource,
        mut backend: Box<dyn InferenceBackend>,
        publisher: P,
    ) -> Result<Self> {
        backend.warm_up().context("inference engine warm-up")?;
        let target = backend.descriptor().input;

        let (cap_w, cap_h) = source.resolution();
        log::info!("capture resolution: {}x{}", cap_w, cap_h);
        log::info!(
            "model '{}' ({}): input {}x{}",
            backend.descriptor().name,
            backend.name(),
            target.width,
            target.height
        );

        Ok(Self {
            source,
            features: FeatureBuffer::new(target),
            backend,
            publisher,
            pacing: PacingController::new(config.interval),
            target,
            channel: config.stream.channel.clone(),
            jpeg_quality: config.stream.jpeg_quality,
            debug: false,
            stop: None,
            cycle_count: 0,
        })
    }

    /// Enable verbose per-cycle logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Install an interactive stop flag. Without one the loop runs until the
    /// process is externally killed.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Run cycles indefinitely. Returns `Ok` only when an interactive stop
    /// was requested; otherwise the first fatal error ends the loop.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.run_cycle()?;
            if let Some(stop) = &self.stop {
                if stop.load(Ordering::SeqCst) {
                    log::info!("stop requested, terminating after {} cycles", self.cycle_count);
                    return Ok(());
                }
            }
        }
    }

    /// Execute exactly one cycle. Exposed so tests can drive the pipeline
    /// without the unbounded loop.
    pub fn run_cycle(&mut self) -> Result<RenderReport> {
        let deadline = self.pacing.begin_cycle();
        self.cycle_count += 1;

        let frame = self.source.next_frame().context("capture frame")?;
        // resize_and_crop's precondition: callers reject malformed captures.
        if frame.width() == 0 || frame.height() == 0 {
            return Err(anyhow!(
                "capture source delivered a zero-dimension frame ({}x{})",
                frame.width(),
                frame.height()
            ));
        }

        if self.debug {
            let region = crop_region(frame.width(), frame.height(), self.target);
            log::debug!(
                "crop_region x={} y={} width={} height={}",
                region.x,
                region.y,
                region.width,
                region.height
            );
        }
        let mut cropped = resize_and_crop(&frame, self.target);

        extract_features(&cropped, &mut self.features)?;

        // A nonzero engine code is a systemic fault; no retry.
        let output = self
            .backend
            .run(&self.features)
            .map_err(|err| anyhow!(err).context("run inference"))?;

        let report = render_result(&mut cropped, &output);
        self.log_report(&report);

        self.pacing.wait_until(deadline);

        // Soft-fail: a temporarily unavailable viewer transport must never
        // stop inference.
        if self.publisher.is_alive() {
            let jpeg = cropped.encode_jpeg(self.jpeg_quality)?;
            self.publisher.publish(&self.channel, &jpeg);
        } else {
            log::warn!("stream publisher is not alive, skipping publish");
        }

        Ok(report)
    }

    fn log_report(&self, report: &RenderReport) {
        match report {
            RenderReport::Objects(boxes) => {
                for bb in boxes {
                    log::info!(
                        "    {} ({:.5}) [ x: {}, y: {}, width: {}, height: {} ]",
                        bb.label,
                        bb.confidence,
                        bb.x,
                        bb.y,
                        bb.width,
                        bb.height
                    );
                }
            }
            RenderReport::NoObjects => match self.backend.descriptor().capability {
                ModelCapability::Detection => log::info!("    no objects found"),
                ModelCapability::Classification => log::info!("    no class above zero"),
            },
            RenderReport::TopClass(top) => {
                log::info!("    {}: {:.2}", top.label, top.confidence);
            }
        }
    }
}
