//! Session configuration.

use std::path::PathBuf;

use crate::composite::overlay::OverlayParams;
use crate::foundation::core::FrameSize;
use crate::foundation::error::{BirdviewError, BirdviewResult};
use crate::transform::birdseye::IpmParams;

/// Output file used by `video` mode when none is given.
pub const DEFAULT_VIDEO_OUTPUT: &str = "carla_BEV_IPM_output_2.mp4";
/// Output file used by `images` mode when none is given.
pub const DEFAULT_IMAGES_OUTPUT: &str = "waymo_BEV_IPM_output.mp4";
/// Log file path used by the binary.
pub const DEFAULT_LOG_FILE: &str = "ipm_processing.log";
/// Frame rate assumed when nothing better is known.
pub const DEFAULT_FPS: f64 = 30.0;

/// Knobs for one processing session.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Every frame is normalized to this size before processing and on output.
    pub frame_size: FrameSize,
    /// Bird's-eye warp geometry.
    pub ipm: IpmParams,
    /// Picture-in-picture placement and border.
    pub overlay: OverlayParams,
    /// Output rate used when the source reports none.
    pub default_fps: f64,
    /// Progress line cadence, in pulled frames.
    pub progress_every: u64,
    /// Rate/average report cadence, in processed frames.
    pub rate_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::default(),
            ipm: IpmParams::default(),
            overlay: OverlayParams::default(),
            default_fps: DEFAULT_FPS,
            progress_every: 100,
            rate_every: 30,
        }
    }
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> BirdviewResult<()> {
        if self.frame_size.is_empty() {
            return Err(BirdviewError::validation(
                "frame width/height must be non-zero",
            ));
        }
        if !self.default_fps.is_finite() || self.default_fps <= 0.0 {
            return Err(BirdviewError::validation("default fps must be positive"));
        }
        if self.progress_every == 0 || self.rate_every == 0 {
            return Err(BirdviewError::validation(
                "report cadences must be non-zero",
            ));
        }
        self.overlay.validate()
    }
}

/// What to read frames from.
#[derive(Clone, Debug, PartialEq)]
pub enum InputSpec {
    /// A video file decoded through ffmpeg.
    Video {
        /// Video file to decode.
        path: PathBuf,
    },
    /// A directory of stills played back at `fps`.
    Images {
        /// Directory scanned for `jpg`, `jpeg` and `png` files.
        dir: PathBuf,
        /// Playback rate of the stills.
        fps: f64,
    },
}

impl InputSpec {
    /// Output file used when none is given for this mode.
    pub fn default_output(&self) -> PathBuf {
        match self {
            Self::Video { .. } => PathBuf::from(DEFAULT_VIDEO_OUTPUT),
            Self::Images { .. } => PathBuf::from(DEFAULT_IMAGES_OUTPUT),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
