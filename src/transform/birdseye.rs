use std::{sync::Arc, time::{Duration, Instant}};

use crate::{
    foundation::{
        core::{Frame, FrameSize, Point, resize_to},
        error::{BirdviewError, BirdviewResult},
    },
    telemetry::{Telemetry, duration_ms},
    transform::homography::{Homography, warp_perspective},
};

/// Fixed trapezoid-to-rectangle geometry for one camera mounting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IpmParams {
    /// Horizontal inset of the far (bottom) destination corners.
    pub param1: i32,
    /// Vertical offset below the horizon line where the source trapezoid starts.
    pub param2: i32,
    /// Wall-clock budget for one transform; overruns are reported as warnings.
    pub budget: Duration,
}

impl Default for IpmParams {
    fn default() -> Self {
        Self {
            param1: 570,
            param2: 35,
            budget: Duration::from_millis(10),
        }
    }
}

/// Inverse perspective mapping stage: forward camera view to bird's-eye view.
#[derive(Debug)]
pub struct BirdsEyeTransform {
    params: IpmParams,
    telemetry: Arc<Telemetry>,
}

impl BirdsEyeTransform {
    /// Create the stage with its telemetry handle.
    pub fn new(params: IpmParams, telemetry: Arc<Telemetry>) -> Self {
        Self { params, telemetry }
    }

    /// Geometry used by this stage.
    pub fn params(&self) -> IpmParams {
        self.params
    }

    /// Lower part of the camera view: `(0, H/2+p2), (W, H/2+p2), (W, H), (0, H)`.
    pub fn source_quad(&self, size: FrameSize) -> [Point; 4] {
        let w = f64::from(size.width);
        let h = f64::from(size.height);
        let top = f64::from(size.height / 2) + f64::from(self.params.param2);
        [
            Point::new(0.0, top),
            Point::new(w, top),
            Point::new(w, h),
            Point::new(0.0, h),
        ]
    }

    /// Warped plane of size `(W, 2H)`: `(0, 0), (W, 0), (W-p1, 2H), (p1, 2H)`.
    pub fn destination_quad(&self, size: FrameSize) -> [Point; 4] {
        let w = f64::from(size.width);
        let h2 = f64::from(size.height) * 2.0;
        let p1 = f64::from(self.params.param1);
        [
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w - p1, h2),
            Point::new(p1, h2),
        ]
    }

    /// Transform for frames of `size`.
    pub fn homography(&self, size: FrameSize) -> BirdviewResult<Homography> {
        Homography::from_points(self.source_quad(size), self.destination_quad(size))
    }

    /// Warp `frame` to the bird's-eye plane and scale it back to the input size.
    pub fn try_warp(&self, frame: &Frame) -> BirdviewResult<Frame> {
        let size = FrameSize::of(frame);
        if size.is_empty() {
            return Err(BirdviewError::transform("input frame is empty"));
        }
        let tall = FrameSize::new(size.width, size.height.saturating_mul(2))?;
        let h = self.homography(size)?;
        let warped = warp_perspective(frame, &h, tall)?;
        resize_to(warped, size)
    }

    /// Like [`BirdsEyeTransform::try_warp`], but never fails: on error the input is returned
    /// unchanged and the failure is logged.
    pub fn warp(&self, frame: &Frame) -> Frame {
        let start = Instant::now();
        let size = FrameSize::of(frame);
        self.telemetry
            .debug(format!("IPM: Processing frame {size}"));

        match self.try_warp(frame) {
            Ok(out) => {
                let elapsed = start.elapsed();
                if elapsed > self.params.budget {
                    self.telemetry.warn(format!(
                        "IPM processing slow: {:.3}ms",
                        duration_ms(elapsed)
                    ));
                }
                out
            }
            Err(e) => {
                self.telemetry.error(format!("IPM failed: {e}"));
                frame.clone()
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/birdseye.rs"]
mod tests;
