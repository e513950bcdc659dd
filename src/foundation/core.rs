use image::imageops::FilterType;

use crate::foundation::error::{BirdviewError, BirdviewResult};

pub use kurbo::Point;

/// 8-bit, 3-channel bitmap flowing through the pipeline (row-major, tightly packed).
pub type Frame = image::RgbImage;

/// Pixel dimensions of a [`Frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameSize {
    /// Create a validated, non-empty size.
    pub fn new(width: u32, height: u32) -> BirdviewResult<Self> {
        if width == 0 || height == 0 {
            return Err(BirdviewError::validation(format!(
                "frame size must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Size of an existing frame (may be empty).
    pub fn of(frame: &Frame) -> Self {
        let (width, height) = frame.dimensions();
        Self { width, height }
    }

    /// Return `true` when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes needed for one RGB8 frame of this size.
    pub fn rgb8_len(self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Return `true` when the frame has no pixels.
pub fn is_empty_frame(frame: &Frame) -> bool {
    FrameSize::of(frame).is_empty()
}

/// Resize `frame` to `size` with bilinear filtering.
///
/// Frames already at `size` are returned untouched.
pub fn resize_to(frame: Frame, size: FrameSize) -> BirdviewResult<Frame> {
    if is_empty_frame(&frame) {
        return Err(BirdviewError::validation("cannot resize an empty frame"));
    }
    if size.is_empty() {
        return Err(BirdviewError::validation(format!(
            "cannot resize to empty size {size}"
        )));
    }
    if FrameSize::of(&frame) == size {
        return Ok(frame);
    }
    Ok(image::imageops::resize(
        &frame,
        size.width,
        size.height,
        FilterType::Triangle,
    ))
}

/// Parse a frame rate that must be a finite number greater than zero.
pub fn parse_positive_fps(s: &str) -> BirdviewResult<f64> {
    let fps: f64 = s
        .trim()
        .parse()
        .map_err(|_| BirdviewError::validation(format!("'{s}' is not a number")))?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err(BirdviewError::validation(format!(
            "frame rate must be a positive number, got {s}"
        )));
    }
    Ok(fps)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
