use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::composite::overlay::OverlayCompositor;
use crate::config::{InputSpec, PipelineConfig};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{FrameSize, resize_to};
use crate::foundation::error::BirdviewResult;
use crate::pipeline::cancel::QuitSignal;
use crate::pipeline::perf::{FrameTiming, PerformanceTracker, StageAverages};
use crate::source::directory::ImageDirectorySource;
use crate::source::stream::VideoStreamSource;
use crate::source::{FrameSource, SourceFrame, SourceInfo, SourceKind};
use crate::telemetry::{Telemetry, duration_ms};
use crate::transform::birdseye::BirdsEyeTransform;

const IPM_TIMER: &str = "IPM_Transform";
const PIP_TIMER: &str = "PIP_Overlay";

/// Lifecycle of one processing session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Opening the sink.
    Initializing,
    /// Pulling and processing frames.
    Running,
    /// Finished normally, including on cancellation.
    Completed,
    /// Sink setup or finalization failed.
    Aborted,
}

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// The source ran out of frames.
    Exhausted,
    /// The quit signal was raised.
    Cancelled,
    /// Setup or finalization failed.
    Aborted(String),
}

/// Outcome of [`Pipeline::run`].
#[derive(Clone, Debug, PartialEq)]
pub struct SessionReport {
    /// Why the session ended.
    pub status: SessionStatus,
    /// Terminal state, `Completed` or `Aborted`.
    pub state: SessionState,
    /// Pulls that yielded an item, including failed ones.
    pub frames_read: u64,
    /// Frames written to the sink.
    pub frames_processed: u64,
    /// Frames dropped after a decode or stage failure.
    pub frames_skipped: u64,
    /// Time from `run` entry to the final summary.
    pub wall_time: Duration,
    /// `None` when no frame was processed.
    pub averages: Option<StageAverages>,
}

impl SessionReport {
    fn aborted(reason: impl Into<String>, started: Instant) -> Self {
        Self {
            status: SessionStatus::Aborted(reason.into()),
            state: SessionState::Aborted,
            frames_read: 0,
            frames_processed: 0,
            frames_skipped: 0,
            wall_time: started.elapsed(),
            averages: None,
        }
    }

    /// `0` for a completed session (cancellation included), `1` for an aborted one.
    pub fn exit_code(&self) -> u8 {
        match self.state {
            SessionState::Completed => 0,
            _ => 1,
        }
    }
}

/// Single-threaded orchestrator: pull, normalize, warp, composite, write.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    transform: BirdsEyeTransform,
    compositor: OverlayCompositor,
    telemetry: Arc<Telemetry>,
}

impl Pipeline {
    /// Validate `config` and build the warp and overlay stages.
    pub fn new(config: PipelineConfig, telemetry: Arc<Telemetry>) -> BirdviewResult<Self> {
        config.validate()?;
        let transform = BirdsEyeTransform::new(config.ipm, telemetry.clone());
        let compositor = OverlayCompositor::new(config.overlay, telemetry.clone())?;
        Ok(Self {
            config,
            transform,
            compositor,
            telemetry,
        })
    }

    /// Configuration the pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Output rate for `info`: the source's nominal rate, or the configured default.
    pub fn output_fps(&self, info: &SourceInfo) -> f64 {
        match info.nominal_fps {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            _ => {
                self.telemetry.warn(format!(
                    "Source reports no usable frame rate, using {} fps",
                    self.config.default_fps
                ));
                self.config.default_fps
            }
        }
    }

    /// Drive one session from `source` into `sink` until exhaustion, cancellation or abort.
    ///
    /// Per-frame failures are logged and skipped. Only `sink.begin` and `sink.end` failures abort.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        quit: &QuitSignal,
    ) -> SessionReport {
        let started = Instant::now();
        let mut state = SessionState::Initializing;
        self.telemetry.debug(format!("Session state: {state:?}"));

        let info = source.info().clone();
        let fps = self.output_fps(&info);
        let size = self.config.frame_size;

        if let Err(e) = sink.begin(SinkConfig { size, fps }) {
            self.telemetry
                .error(format!("Unable to create output video file: {e}"));
            self.transition(&mut state, SessionState::Aborted);
            return SessionReport::aborted(e.to_string(), started);
        }
        self.telemetry.info("Video writer initialized successfully");
        match info.total_frames {
            Some(total) => self
                .telemetry
                .info(format!("Processing {total} frames at {fps} fps ({size})")),
            None => self
                .telemetry
                .info(format!("Processing frames at {fps} fps ({size})")),
        }
        self.transition(&mut state, SessionState::Running);

        let target_ms = 1000.0 / fps;
        let mut perf = PerformanceTracker::new(self.telemetry.clone(), self.config.rate_every);
        let mut frames_read = 0u64;
        let mut frames_skipped = 0u64;
        let mut next_out_idx = 0u64;
        let mut status = SessionStatus::Exhausted;

        loop {
            let frame_start = Instant::now();
            let Some(item) = source.next_frame() else {
                self.telemetry.info(format!(
                    "End of input reached. Processed {} frames",
                    perf.frame_count()
                ));
                break;
            };
            frames_read += 1;
            self.log_progress(frames_read, info.total_frames);

            match item {
                Err(e) => {
                    self.telemetry
                        .warn(format!("Failed to read frame {frames_read} - skipping: {e}"));
                    frames_skipped += 1;
                }
                Ok(pulled) => {
                    let label = pulled.label.clone();
                    match self.process_frame(pulled, &mut next_out_idx, sink, frame_start) {
                        Ok(timing) => {
                            perf.record(timing);
                            let total_ms = duration_ms(timing.total);
                            if total_ms > target_ms {
                                self.telemetry.warn(format!(
                                    "Frame {frames_read} processing slow: {total_ms:.3}ms (target: {target_ms:.3}ms for {fps} fps)"
                                ));
                            }
                        }
                        Err(e) => {
                            self.telemetry
                                .error(format!("Error processing {label}: {e}"));
                            frames_skipped += 1;
                        }
                    }
                }
            }

            if quit.is_raised() {
                self.telemetry.info("Processing interrupted");
                status = SessionStatus::Cancelled;
                break;
            }
        }

        if let Err(e) = sink.end() {
            self.telemetry
                .error(format!("Failed to finalize output video: {e}"));
            status = SessionStatus::Aborted(e.to_string());
        }
        let wall_time = started.elapsed();

        let processed = perf.frame_count();
        let seconds = wall_time.as_secs_f64();
        self.telemetry.info("=== Processing Completed ===");
        self.telemetry
            .info(format!("Total processing time: {seconds:.3} seconds"));
        if seconds > 0.0 {
            self.telemetry.info(format!(
                "Average processing speed: {:.3} fps",
                processed as f64 / seconds
            ));
        }
        self.telemetry
            .log_memory_usage("Frame buffer", self.working_set_bytes());
        perf.log_summary();

        let terminal = match status {
            SessionStatus::Aborted(_) => SessionState::Aborted,
            _ => SessionState::Completed,
        };
        self.transition(&mut state, terminal);

        SessionReport {
            status,
            state,
            frames_read,
            frames_processed: processed,
            frames_skipped,
            wall_time,
            averages: perf.averages(),
        }
    }

    fn process_frame(
        &self,
        pulled: SourceFrame,
        next_out_idx: &mut u64,
        sink: &mut dyn FrameSink,
        frame_start: Instant,
    ) -> BirdviewResult<FrameTiming> {
        let size = self.config.frame_size;
        let frame = resize_to(pulled.frame, size)?;

        self.telemetry.start_timer(IPM_TIMER);
        let ipm_start = Instant::now();
        let warped = self.transform.warp(&frame);
        let ipm = ipm_start.elapsed();
        self.telemetry.end_timer(IPM_TIMER);

        self.telemetry.start_timer(PIP_TIMER);
        let pip_start = Instant::now();
        let composited = self.compositor.composite(frame, &warped);
        let pip = pip_start.elapsed();
        self.telemetry.end_timer(PIP_TIMER);

        let output = resize_to(composited, size)?;
        // Every push attempt consumes an index, so indices stay strictly increasing after a failure.
        let out_idx = *next_out_idx;
        *next_out_idx += 1;
        sink.push_frame(out_idx, &output)?;

        Ok(FrameTiming {
            total: frame_start.elapsed(),
            ipm,
            pip,
        })
    }

    /// Bytes held by the buffers one frame passes through.
    ///
    /// Normalized input, the double-height warp, the warp scaled back, and the resized and
    /// bordered overlay. The composite reuses the input buffer.
    pub(crate) fn working_set_bytes(&self) -> usize {
        let size = self.config.frame_size;
        let tall = FrameSize {
            width: size.width,
            height: size.height.saturating_mul(2),
        };
        let overlay = self
            .compositor
            .placement(size, size)
            .map(|p| p.resized.rgb8_len() + p.bordered.rgb8_len())
            .unwrap_or(0);
        size.rgb8_len() * 2 + tall.rgb8_len() + overlay
    }

    fn log_progress(&self, n: u64, total: Option<u64>) {
        if !n.is_multiple_of(self.config.progress_every) {
            return;
        }
        match total {
            Some(t) if t > 0 => self
                .telemetry
                .info(format!("Processing frame {n}/{t} ({}%)", n * 100 / t)),
            _ => self.telemetry.info(format!("Processing frame {n}")),
        }
    }

    fn transition(&self, state: &mut SessionState, next: SessionState) {
        self.telemetry
            .debug(format!("Session state: {state:?} -> {next:?}"));
        *state = next;
    }
}

/// Open the source described by `input`.
pub fn open_source(input: &InputSpec) -> BirdviewResult<Box<dyn FrameSource>> {
    Ok(match input {
        InputSpec::Video { path } => Box::new(VideoStreamSource::open(path)?),
        InputSpec::Images { dir, fps } => Box::new(ImageDirectorySource::open(dir, *fps)?),
    })
}

/// Run a full session from `input` into an MP4 at `output`.
///
/// The output file is only created once the source has been opened successfully.
pub fn process_input(
    input: &InputSpec,
    output: &Path,
    config: &PipelineConfig,
    telemetry: Arc<Telemetry>,
    quit: &QuitSignal,
) -> SessionReport {
    let started = Instant::now();
    let pipeline = match Pipeline::new(config.clone(), telemetry.clone()) {
        Ok(p) => p,
        Err(e) => {
            telemetry.error(format!("Invalid pipeline configuration: {e}"));
            return SessionReport::aborted(e.to_string(), started);
        }
    };

    match input {
        InputSpec::Video { path } => {
            telemetry.info("=== IPM Video Processing Started ===");
            telemetry.info(format!("Input Video: {}", path.display()));
        }
        InputSpec::Images { dir, .. } => {
            telemetry.info("=== Image Sequence Processing Started ===");
            telemetry.info(format!("Input Directory: {}", dir.display()));
        }
    }
    telemetry.info(format!("Output Video: {}", output.display()));

    let mut source = match open_source(input) {
        Ok(s) => s,
        Err(e) => {
            telemetry.error(format!("Unable to open input: {e}"));
            return SessionReport::aborted(e.to_string(), started);
        }
    };
    log_source_info(&telemetry, source.info());

    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(output));
    let report = pipeline.run(source.as_mut(), &mut sink, quit);
    if report.state == SessionState::Completed {
        telemetry.info(format!("Video saved as: {}", output.display()));
    }
    report
}

fn log_source_info(telemetry: &Telemetry, info: &SourceInfo) {
    if info.kind == SourceKind::ImageSequence {
        telemetry.info(format!(
            "Found {} image files in directory: {}",
            info.total_frames.unwrap_or(0),
            info.description
        ));
    }
    for entry in &info.unreadable_entries {
        telemetry.warn(format!(
            "Skipped unreadable entry in {}: {entry}",
            info.description
        ));
    }

    let size = info
        .native_size
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown size".to_string());
    let fps = info
        .nominal_fps
        .map(|f| format!("{f:.3} fps"))
        .unwrap_or_else(|| "unknown fps".to_string());
    let frames = info
        .total_frames
        .map(|n| format!("{n} frames"))
        .unwrap_or_else(|| "unknown frame count".to_string());
    telemetry.info(format!(
        "Source properties ({:?}): {size}, {fps}, {frames}",
        info.kind
    ));
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/session.rs"]
mod tests;
