use std::sync::Arc;

use super::*;
use crate::telemetry::{MemorySink, Severity};

const GREY: [u8; 3] = [40, 40, 40];
const RED: [u8; 3] = [220, 10, 10];

fn stage(params: OverlayParams) -> (Arc<MemorySink>, OverlayCompositor) {
    let sink = Arc::new(MemorySink::new());
    let telemetry = Arc::new(Telemetry::new(sink.clone()));
    (sink, OverlayCompositor::new(params, telemetry).unwrap())
}

fn size(w: u32, h: u32) -> FrameSize {
    FrameSize::new(w, h).unwrap()
}

#[test]
fn zero_ratio_is_rejected() {
    let params = OverlayParams {
        ratio: 0,
        ..OverlayParams::default()
    };
    assert!(OverlayCompositor::new(params, Arc::new(Telemetry::disabled())).is_err());
}

#[test]
fn square_overlay_on_default_primary_fits() {
    let (_, pip) = stage(OverlayParams::default());
    let p = pip.placement(size(1280, 800), size(500, 500)).unwrap();

    assert_eq!(p.resized, size(266, 266));
    assert_eq!(p.bordered.width, p.resized.width + 2 * 3);
    assert_eq!(p.bordered, size(272, 272));
    assert_eq!(p.x, 1280 - 272 - 30);
    assert_eq!(p.y, 400 - 272 - 100);
    assert!(p.fits(size(1280, 800)));
}

#[test]
fn aspect_ratio_is_preserved_with_truncation() {
    let (_, pip) = stage(OverlayParams::default());
    let p = pip.placement(size(1280, 800), size(1280, 800)).unwrap();
    // 266 * 1.6 = 425.6 -> 425
    assert_eq!(p.resized, size(425, 266));
    assert_eq!(p.bordered, size(431, 272));
    assert_eq!((p.x, p.y), (819, 28));
}

#[test]
fn fitting_overlay_is_copied_with_white_border() {
    let (sink, pip) = stage(OverlayParams::default());
    let primary = Frame::from_pixel(1280, 800, Rgb(GREY));
    let overlay = Frame::from_pixel(300, 300, Rgb(RED));

    let out = pip.composite(primary, &overlay);
    let (x, y) = (1280 - 272 - 30, 400 - 272 - 100);

    assert_eq!(out.get_pixel(x, y).0, [255, 255, 255]);
    assert_eq!(out.get_pixel(x + 2, y + 100).0, [255, 255, 255]);
    assert_eq!(out.get_pixel(x + 271, y + 271).0, [255, 255, 255]);
    assert_eq!(out.get_pixel(x + 3, y + 3).0, RED);
    assert_eq!(out.get_pixel(x + 135, y + 135).0, RED);
    assert_eq!(out.get_pixel(x - 1, y).0, GREY);
    assert_eq!(out.get_pixel(x + 272, y).0, GREY);
    assert_eq!(out.get_pixel(x, y + 272).0, GREY);
    assert_eq!(out.get_pixel(0, 0).0, GREY);
    assert_eq!(sink.records().len(), 0);
}

#[test]
fn out_of_bounds_placement_returns_identical_primary() {
    let (sink, pip) = stage(OverlayParams::default());
    // 166 + 6 = 172 tall; y = 250 - 172 - 100 < 0.
    let primary_size = size(1280, 500);
    let p = pip.placement(primary_size, size(400, 400)).unwrap();
    assert!(p.y < 0);
    assert!(!p.fits(primary_size));

    let mut primary = Frame::from_pixel(1280, 500, Rgb(GREY));
    primary.put_pixel(1000, 20, Rgb([1, 2, 3]));
    let before = primary.clone();

    let outcome = pip.try_composite(&mut primary, &Frame::from_pixel(400, 400, Rgb(RED)));
    assert!(matches!(outcome, Ok(CompositeOutcome::Skipped(_))));
    assert_eq!(primary, before);

    let out = pip.composite(primary, &Frame::from_pixel(400, 400, Rgb(RED)));
    assert_eq!(out, before);
    assert_eq!(sink.count(Severity::Error), 0);
}

#[test]
fn too_wide_overlay_is_skipped_on_the_left_edge() {
    let (_, pip) = stage(OverlayParams::default());
    let p = pip.placement(size(1280, 800), size(4000, 300)).unwrap();
    assert!(p.x < 0);
    assert!(!p.fits(size(1280, 800)));
}

#[test]
fn empty_inputs_log_error_and_return_primary() {
    let (sink, pip) = stage(OverlayParams::default());
    let primary = Frame::from_pixel(64, 64, Rgb(GREY));

    let out = pip.composite(primary.clone(), &Frame::new(0, 0));
    assert_eq!(out, primary);
    let out = pip.composite(Frame::new(0, 0), &primary);
    assert_eq!(out.dimensions(), (0, 0));

    assert_eq!(sink.count(Severity::Error), 2);
    assert!(sink.contains("PIP: One or both images are empty"));
}

#[test]
fn collapsed_overlay_size_degrades_to_primary() {
    let (sink, pip) = stage(OverlayParams::default());
    // 2 / 3 == 0 rows: the resize target is empty.
    let primary = Frame::from_pixel(16, 2, Rgb(GREY));
    let out = pip.composite(primary.clone(), &Frame::from_pixel(4, 4, Rgb(RED)));
    assert_eq!(out, primary);
    assert!(sink.contains("PIP failed: composite error:"));
}
