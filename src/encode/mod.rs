//! Output sinks.
//!
//! Sinks consume composited frames in processing order and are driven by the pipeline session.

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub(crate) mod ffmpeg;
/// Generic frame sink trait and the in-memory sink.
pub(crate) mod sink;
