use std::{sync::Arc, thread};

use super::*;
use crate::telemetry::{FileSink, MemorySink, format_log_line};

fn recording() -> (Arc<MemorySink>, Telemetry) {
    let sink = Arc::new(MemorySink::new());
    let telemetry = Telemetry::new(sink.clone());
    (sink, telemetry)
}

#[test]
fn line_shapes_are_stable() {
    assert_eq!(
        format_performance("IPM_Transform", 1.23456, "ms"),
        "PERF | IPM_Transform: 1.235ms"
    );
    assert_eq!(
        format_count("Total Frames Processed", 3, " frames"),
        "PERF | Total Frames Processed: 3 frames"
    );
    assert_eq!(
        format_memory("Frame buffer", 3 * 1024 * 1024 / 2),
        "MEM | Frame buffer: 1.50MB"
    );
    assert_eq!(
        format_frame_rate(29.96),
        "FPS | Current frame rate: 30.0 fps"
    );
}

#[test]
fn timer_roundtrip_reports_and_removes_entry() {
    let (sink, telemetry) = recording();
    telemetry.start_timer("PIP_Overlay");
    assert_eq!(telemetry.active_timers(), 1);

    let elapsed = telemetry.end_timer("PIP_Overlay");
    assert!(elapsed.is_some());
    assert_eq!(telemetry.active_timers(), 0);
    assert!(sink.contains("PERF | PIP_Overlay: "));
    assert_eq!(sink.count(Severity::Info), 1);
}

#[test]
fn missing_timer_is_a_warning_without_state_change() {
    let (sink, telemetry) = recording();
    telemetry.start_timer("a");
    assert!(telemetry.end_timer("b").is_none());
    assert_eq!(telemetry.active_timers(), 1);
    assert_eq!(sink.count(Severity::Warn), 1);
    assert!(sink.contains("Timer not found for operation: b"));
}

#[test]
fn concurrent_timers_and_logs_are_serialized() {
    let (sink, telemetry) = recording();
    let telemetry = Arc::new(telemetry);

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let t = telemetry.clone();
            thread::spawn(move || {
                let label = format!("op{i}");
                for _ in 0..50 {
                    t.start_timer(&label);
                    t.end_timer(&label);
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    assert_eq!(telemetry.active_timers(), 0);
    assert_eq!(sink.records().len(), 8 * 50);
    assert_eq!(sink.count(Severity::Warn), 0);
}

#[test]
fn disabled_handle_accepts_everything() {
    let telemetry = Telemetry::disabled();
    telemetry.critical("nobody listens");
    assert!(telemetry.end_timer("missing").is_none());
}

#[test]
fn log_line_has_millisecond_timestamp_and_tag() {
    use chrono::TimeZone as _;
    let at = chrono::Local
        .with_ymd_and_hms(2025, 6, 24, 13, 5, 9)
        .single()
        .unwrap()
        + chrono::Duration::milliseconds(42);
    assert_eq!(
        format_log_line(&at, Severity::Warn, "slow"),
        "[2025-06-24 13:05:09.042] WARN : slow\n"
    );
}

#[test]
fn file_sink_appends_one_line_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("run.log");

    {
        let telemetry = Telemetry::new(Arc::new(FileSink::open(&path).unwrap()));
        telemetry.info("first");
        telemetry.error("second");
    }
    {
        let telemetry = Telemetry::new(Arc::new(FileSink::open(&path).unwrap()));
        telemetry.log_frame_rate(12.0);
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("INFO : first"));
    assert!(lines[1].ends_with("ERROR: second"));
    assert!(lines[2].ends_with("FPS | Current frame rate: 12.0 fps"));
    assert!(lines.iter().all(|l| l.starts_with('[') && l.as_bytes()[24] == b']'));
}
