use crate::foundation::core::{Frame, FrameSize};
use crate::foundation::error::BirdviewResult;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkConfig {
    /// Output frame size; every pushed frame has exactly this size.
    pub size: FrameSize,
    /// Output frames-per-second.
    pub fps: f64,
}

/// Sink contract for consuming output frames.
///
/// Ordering contract: `push_frame` is called with strictly increasing indices.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> BirdviewResult<()>;
    /// Push one output frame.
    fn push_frame(&mut self, idx: u64, frame: &Frame) -> BirdviewResult<()>;
    /// Called once after the last frame is pushed. Finalizes the output.
    fn end(&mut self) -> BirdviewResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(u64, Frame)>,
    ended: bool,
}

impl InMemorySink {
    /// Empty sink awaiting `begin`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Pushed frames with their indices, in push order.
    pub fn frames(&self) -> &[(u64, Frame)] {
        &self.frames
    }

    /// Whether `end` has been called since the last `begin`.
    pub fn is_finished(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> BirdviewResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &Frame) -> BirdviewResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> BirdviewResult<()> {
        self.ended = true;
        Ok(())
    }
}
