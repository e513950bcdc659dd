//! Frame sources: a forward-only, finite sequence of raw frames.
//!
//! The pipeline only sees [`FrameSource`]; whether frames come from a decoded video stream or a
//! sorted directory of stills is decided when the source is opened.

pub(crate) mod directory;
pub(crate) mod memory;
pub(crate) mod stream;

use crate::foundation::{core::Frame, error::BirdviewResult};

/// Which kind of input backs a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Decoded video container.
    Video,
    /// Sorted directory of still images.
    ImageSequence,
    /// Frames held in memory.
    Memory,
}

/// Metadata reported by a source when it is opened.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    /// Input kind.
    pub kind: SourceKind,
    /// Human-readable origin (path or label).
    pub description: String,
    /// Nominal frame rate, best-effort.
    pub nominal_fps: Option<f64>,
    /// Expected number of frames, best-effort.
    pub total_frames: Option<u64>,
    /// Native frame size, when known up front.
    pub native_size: Option<crate::foundation::core::FrameSize>,
    /// Directory entries that could not be read while enumerating the input.
    pub unreadable_entries: Vec<String>,
}

/// One pulled frame together with a label for diagnostics.
#[derive(Clone, Debug)]
pub struct SourceFrame {
    /// Decoded pixels at the source's native size.
    pub frame: Frame,
    /// File path or `frame N`.
    pub label: String,
}

/// Ordered producer of raw frames.
///
/// `next_frame` returns `None` once the source is exhausted. An `Err` item means only that
/// one frame could not be produced; later pulls may still succeed.
pub trait FrameSource {
    /// Metadata captured at open time.
    fn info(&self) -> &SourceInfo;

    /// Pull the next frame in source order.
    fn next_frame(&mut self) -> Option<BirdviewResult<SourceFrame>>;
}
