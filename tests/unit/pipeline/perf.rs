use super::*;
use crate::telemetry::MemorySink;

fn tracker(rate_every: u64) -> (PerformanceTracker, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let telemetry = Arc::new(Telemetry::new(sink.clone()));
    (PerformanceTracker::new(telemetry, rate_every), sink)
}

fn timing(total: u64, ipm: u64, pip: u64) -> FrameTiming {
    FrameTiming {
        total: Duration::from_millis(total),
        ipm: Duration::from_millis(ipm),
        pip: Duration::from_millis(pip),
    }
}

#[test]
fn averages_are_means_of_recorded_frames() {
    let (mut perf, _) = tracker(30);
    assert_eq!(perf.averages(), None);
    perf.record(timing(10, 4, 2));
    perf.record(timing(20, 6, 4));
    let avg = perf.averages().unwrap();
    assert_eq!(perf.frame_count(), 2);
    assert!((avg.total_ms - 15.0).abs() < 1e-9);
    assert!((avg.ipm_ms - 5.0).abs() < 1e-9);
    assert!((avg.pip_ms - 3.0).abs() < 1e-9);
}

#[test]
fn rate_report_fires_on_cadence() {
    let (mut perf, sink) = tracker(3);
    perf.record(timing(1, 1, 1));
    perf.record(timing(1, 1, 1));
    assert_eq!(sink.matching("Avg Processing Time"), 0);
    perf.record(timing(1, 1, 1));
    assert_eq!(sink.matching("Avg Processing Time"), 1);
    assert_eq!(sink.matching("Avg IPM Time"), 1);
    assert_eq!(sink.matching("Avg PIP Time"), 1);
}

#[test]
fn summary_reports_total_and_averages() {
    let (mut perf, sink) = tracker(30);
    for _ in 0..3 {
        perf.record(timing(9, 3, 3));
    }
    perf.log_summary();
    assert!(sink.contains("=== Performance Summary ==="));
    assert!(sink.contains("PERF | Total Frames Processed: 3 frames"));
    assert!(sink.contains("PERF | Average Processing Time: 9.000ms"));
}

#[test]
fn empty_summary_has_no_averages() {
    let (perf, sink) = tracker(30);
    perf.log_summary();
    assert!(sink.contains("PERF | Total Frames Processed: 0 frames"));
    assert_eq!(sink.matching("Average"), 0);
}
