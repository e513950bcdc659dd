use std::sync::Arc;

use image::{GenericImage as _, Rgb, imageops::FilterType};

use crate::{
    foundation::{
        core::{Frame, FrameSize, is_empty_frame},
        error::{BirdviewError, BirdviewResult},
    },
    telemetry::Telemetry,
};

/// Tunables for the picture-in-picture overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayParams {
    /// Overlay height is `primary_height / ratio`.
    pub ratio: u32,
    /// Solid border thickness in pixels.
    pub border: u32,
    /// Gap between the bordered overlay and the right edge of the primary frame.
    pub margin_x: i32,
    /// Vertical adjustment applied after centering.
    pub offset_y: i32,
    /// Border color.
    pub border_color: [u8; 3],
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            ratio: 3,
            border: 3,
            margin_x: 30,
            offset_y: -100,
            border_color: [255, 255, 255],
        }
    }
}

impl OverlayParams {
    /// Reject parameter sets that cannot produce an overlay.
    pub fn validate(&self) -> BirdviewResult<()> {
        if self.ratio == 0 {
            return Err(BirdviewError::validation("overlay ratio must be non-zero"));
        }
        Ok(())
    }
}

/// Where the bordered overlay lands on the primary frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Overlay size after the aspect-preserving resize.
    pub resized: FrameSize,
    /// Overlay size including the border on all four sides.
    pub bordered: FrameSize,
    /// Left edge on the primary frame (may be negative).
    pub x: i64,
    /// Top edge on the primary frame (may be negative).
    pub y: i64,
}

impl Placement {
    /// Return `true` when the bordered rectangle lies fully inside `primary`.
    pub fn fits(&self, primary: FrameSize) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x + i64::from(self.bordered.width) <= i64::from(primary.width)
            && self.y + i64::from(self.bordered.height) <= i64::from(primary.height)
    }
}

/// Result of a compositing attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeOutcome {
    /// The overlay was copied onto the primary frame.
    Placed(Placement),
    /// The overlay did not fit; the primary frame is untouched.
    Skipped(Placement),
}

/// Picture-in-picture stage.
#[derive(Debug)]
pub struct OverlayCompositor {
    params: OverlayParams,
    telemetry: Arc<Telemetry>,
}

impl OverlayCompositor {
    /// Create the stage; `params` must pass [`OverlayParams::validate`].
    pub fn new(params: OverlayParams, telemetry: Arc<Telemetry>) -> BirdviewResult<Self> {
        params.validate()?;
        Ok(Self { params, telemetry })
    }

    /// Parameters used by this stage.
    pub fn params(&self) -> OverlayParams {
        self.params
    }

    /// Compute the overlay rectangle for the given input sizes.
    pub fn placement(&self, primary: FrameSize, overlay: FrameSize) -> BirdviewResult<Placement> {
        if primary.is_empty() || overlay.is_empty() {
            return Err(BirdviewError::composite("one or both images are empty"));
        }
        let height = primary.height / self.params.ratio;
        let aspect = f64::from(overlay.width) / f64::from(overlay.height);
        let width = (f64::from(height) * aspect) as u32;
        if width == 0 || height == 0 {
            return Err(BirdviewError::composite(format!(
                "overlay resize to {width}x{height} is empty"
            )));
        }

        let border2 = self.params.border.saturating_mul(2);
        let bordered = FrameSize {
            width: width.saturating_add(border2),
            height: height.saturating_add(border2),
        };
        let x = i64::from(primary.width)
            - i64::from(bordered.width)
            - i64::from(self.params.margin_x);
        let y = i64::from(primary.height / 2) - i64::from(bordered.height)
            + i64::from(self.params.offset_y);

        Ok(Placement {
            resized: FrameSize { width, height },
            bordered,
            x,
            y,
        })
    }

    /// Composite `overlay` onto `primary` in place.
    ///
    /// `primary` is only written once the bordered overlay is fully built and known to fit.
    pub fn try_composite(
        &self,
        primary: &mut Frame,
        overlay: &Frame,
    ) -> BirdviewResult<CompositeOutcome> {
        let placement = self.placement(FrameSize::of(primary), FrameSize::of(overlay))?;
        if !placement.fits(FrameSize::of(primary)) {
            return Ok(CompositeOutcome::Skipped(placement));
        }

        let resized = image::imageops::resize(
            overlay,
            placement.resized.width,
            placement.resized.height,
            FilterType::Triangle,
        );
        let mut bordered = Frame::from_pixel(
            placement.bordered.width,
            placement.bordered.height,
            Rgb(self.params.border_color),
        );
        bordered
            .copy_from(&resized, self.params.border, self.params.border)
            .map_err(|e| BirdviewError::composite(format!("border copy failed: {e}")))?;

        let x = u32::try_from(placement.x)
            .map_err(|_| BirdviewError::composite("overlay x offset out of range"))?;
        let y = u32::try_from(placement.y)
            .map_err(|_| BirdviewError::composite("overlay y offset out of range"))?;
        primary
            .copy_from(&bordered, x, y)
            .map_err(|e| BirdviewError::composite(format!("overlay copy failed: {e}")))?;

        Ok(CompositeOutcome::Placed(placement))
    }

    /// Composite `overlay` onto `primary`, degrading to the unmodified primary on any failure.
    pub fn composite(&self, mut primary: Frame, overlay: &Frame) -> Frame {
        if is_empty_frame(&primary) || is_empty_frame(overlay) {
            self.telemetry.error("PIP: One or both images are empty");
            return primary;
        }
        match self.try_composite(&mut primary, overlay) {
            Ok(CompositeOutcome::Placed(_)) => {}
            Ok(CompositeOutcome::Skipped(p)) => self.telemetry.debug(format!(
                "PIP: overlay {}x{} at ({}, {}) does not fit, skipped",
                p.bordered.width, p.bordered.height, p.x, p.y
            )),
            Err(e) => self.telemetry.error(format!("PIP failed: {e}")),
        }
        primary
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/overlay.rs"]
mod tests;
