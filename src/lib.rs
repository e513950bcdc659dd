//! Birdview turns a forward-facing camera feed into a bird's-eye view and composites it
//! picture-in-picture over the original.
//!
//! The public API is session-oriented:
//!
//! - Open a [`FrameSource`] (video file via `ffmpeg`, or a sorted directory of stills)
//! - Create a [`Pipeline`] with a [`PipelineConfig`] and a shared [`Telemetry`] handle
//! - [`Pipeline::run`] streams composited frames into a [`FrameSink`]
//!
//! [`process_input`] wires the whole thing for the command-line tool.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod composite;
pub(crate) mod config;
pub(crate) mod encode;
pub(crate) mod pipeline;
pub(crate) mod source;
/// Logging and named timers.
pub mod telemetry;
pub(crate) mod transform;

pub use crate::foundation::core::{
    Frame, FrameSize, Point, is_empty_frame, parse_positive_fps, resize_to,
};
pub use crate::foundation::error::{BirdviewError, BirdviewResult};

pub use crate::composite::overlay::{
    CompositeOutcome, OverlayCompositor, OverlayParams, Placement,
};
pub use crate::config::{
    DEFAULT_FPS, DEFAULT_IMAGES_OUTPUT, DEFAULT_LOG_FILE, DEFAULT_VIDEO_OUTPUT, InputSpec,
    PipelineConfig,
};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, ensure_parent_dir, is_ffmpeg_on_path};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::pipeline::cancel::QuitSignal;
pub use crate::pipeline::perf::{FrameTiming, PerformanceTracker, StageAverages};
pub use crate::pipeline::session::{
    Pipeline, SessionReport, SessionState, SessionStatus, open_source, process_input,
};
pub use crate::source::directory::{IMAGE_EXTENSIONS, ImageDirectorySource, list_image_files};
pub use crate::source::memory::MemorySource;
pub use crate::source::stream::{VideoProbe, VideoStreamSource, probe_video};
pub use crate::source::{FrameSource, SourceFrame, SourceInfo, SourceKind};
pub use crate::telemetry::Telemetry;
pub use crate::transform::birdseye::{BirdsEyeTransform, IpmParams};
pub use crate::transform::homography::{Homography, warp_perspective};
