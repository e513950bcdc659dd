use std::collections::VecDeque;

use crate::{
    foundation::{
        core::{Frame, FrameSize},
        error::{BirdviewError, BirdviewResult},
    },
    source::{FrameSource, SourceFrame, SourceInfo, SourceKind},
};

/// Source over frames already in memory; entries may be injected failures.
#[derive(Debug)]
pub struct MemorySource {
    info: SourceInfo,
    items: VecDeque<Result<Frame, String>>,
    pulled: u64,
}

impl MemorySource {
    /// Source yielding `frames` in order at `fps`.
    pub fn new(frames: Vec<Frame>, fps: Option<f64>) -> Self {
        Self::with_items(frames.into_iter().map(Ok).collect(), fps)
    }

    /// Source where an `Err(reason)` item is reported as a decode failure.
    pub fn with_items(items: Vec<Result<Frame, String>>, fps: Option<f64>) -> Self {
        let native_size = items
            .iter()
            .find_map(|i| i.as_ref().ok())
            .map(FrameSize::of);
        Self {
            info: SourceInfo {
                kind: SourceKind::Memory,
                description: "memory".to_string(),
                nominal_fps: fps,
                total_frames: Some(items.len() as u64),
                native_size,
                unreadable_entries: Vec::new(),
            },
            items: items.into(),
            pulled: 0,
        }
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Option<BirdviewResult<SourceFrame>> {
        let item = self.items.pop_front()?;
        self.pulled += 1;
        let label = format!("frame {}", self.pulled);
        Some(
            item.map(|frame| SourceFrame { frame, label })
                .map_err(BirdviewError::decode),
        )
    }
}
