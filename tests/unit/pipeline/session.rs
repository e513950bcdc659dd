use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{Frame, FrameSize};
use crate::foundation::error::BirdviewError;
use crate::source::memory::MemorySource;
use crate::telemetry::{MemorySink, Severity};
use crate::transform::birdseye::IpmParams;

fn small_config() -> PipelineConfig {
    PipelineConfig {
        frame_size: FrameSize::new(64, 48).unwrap(),
        ipm: IpmParams {
            param1: 20,
            param2: 4,
            budget: Duration::from_secs(1),
        },
        ..PipelineConfig::default()
    }
}

fn pipeline(config: PipelineConfig) -> (Pipeline, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let telemetry = Arc::new(Telemetry::new(sink.clone()));
    (Pipeline::new(config, telemetry).unwrap(), sink)
}

fn gray(w: u32, h: u32) -> Frame {
    Frame::from_pixel(w, h, image::Rgb([90, 90, 90]))
}

/// Accepts `begin`, then fails on the listed push attempts (1-based).
#[derive(Default)]
struct FlakySink {
    fail_on_push: Vec<usize>,
    pushes: usize,
    attempted: Vec<u64>,
    written: Vec<u64>,
    fail_begin: bool,
    fail_end: bool,
}

impl FrameSink for FlakySink {
    fn begin(&mut self, _cfg: SinkConfig) -> BirdviewResult<()> {
        if self.fail_begin {
            return Err(BirdviewError::encode("cannot open"));
        }
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, _frame: &Frame) -> BirdviewResult<()> {
        self.pushes += 1;
        self.attempted.push(idx);
        if self.fail_on_push.contains(&self.pushes) {
            return Err(BirdviewError::encode("disk full"));
        }
        self.written.push(idx);
        Ok(())
    }

    fn end(&mut self) -> BirdviewResult<()> {
        if self.fail_end {
            return Err(BirdviewError::encode("trailer write failed"));
        }
        Ok(())
    }
}

#[test]
fn frames_are_normalized_to_the_configured_size() {
    let (p, _) = pipeline(small_config());
    let mut source = MemorySource::new(vec![gray(100, 30), gray(64, 48)], Some(10.0));
    let mut sink = InMemorySink::new();
    let report = p.run(&mut source, &mut sink, &QuitSignal::new());

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.status, SessionStatus::Exhausted);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(sink.config().unwrap().fps, 10.0);
    for (_, frame) in sink.frames() {
        assert_eq!(FrameSize::of(frame), FrameSize::new(64, 48).unwrap());
    }
}

#[test]
fn missing_fps_falls_back_to_default_with_warning() {
    let (p, log) = pipeline(small_config());
    let mut source = MemorySource::new(vec![gray(64, 48)], None);
    let mut sink = InMemorySink::new();
    p.run(&mut source, &mut sink, &QuitSignal::new());
    assert_eq!(sink.config().unwrap().fps, 30.0);
    assert!(log.contains("no usable frame rate"));
}

#[test]
fn sink_begin_failure_aborts_before_pulling() {
    let (p, log) = pipeline(small_config());
    let mut source = MemorySource::new(vec![gray(64, 48)], Some(30.0));
    let mut sink = FlakySink {
        fail_begin: true,
        ..FlakySink::default()
    };
    let report = p.run(&mut source, &mut sink, &QuitSignal::new());
    assert_eq!(report.state, SessionState::Aborted);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.frames_read, 0);
    assert!(matches!(report.status, SessionStatus::Aborted(_)));
    assert!(log.contains("Unable to create output video file"));
}

#[test]
fn write_failure_skips_only_that_frame() {
    let (p, log) = pipeline(small_config());
    let frames = (0..4).map(|_| gray(64, 48)).collect();
    let mut source = MemorySource::new(frames, Some(30.0));
    let mut sink = FlakySink {
        fail_on_push: vec![2],
        ..FlakySink::default()
    };
    let report = p.run(&mut source, &mut sink, &QuitSignal::new());

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.frames_read, 4);
    assert_eq!(report.frames_processed, 3);
    assert_eq!(report.frames_skipped, 1);
    assert_eq!(sink.attempted, vec![0, 1, 2, 3]);
    assert_eq!(sink.written, vec![0, 2, 3]);
    assert!(log.contains("Error processing frame 2: encode error: disk full"));
}

#[test]
fn indices_stay_strictly_increasing_across_repeated_failures() {
    let (p, _) = pipeline(small_config());
    let frames = (0..6).map(|_| gray(64, 48)).collect();
    let mut source = MemorySource::new(frames, Some(30.0));
    let mut sink = FlakySink {
        fail_on_push: vec![1, 3, 4],
        ..FlakySink::default()
    };
    let report = p.run(&mut source, &mut sink, &QuitSignal::new());

    assert_eq!(report.frames_processed, 3);
    assert_eq!(report.frames_skipped, 3);
    assert!(sink.attempted.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(sink.written, vec![1, 4, 5]);
}

#[test]
fn end_failure_marks_session_aborted() {
    let (p, _) = pipeline(small_config());
    let mut source = MemorySource::new(vec![gray(64, 48)], Some(30.0));
    let mut sink = FlakySink {
        fail_end: true,
        ..FlakySink::default()
    };
    let report = p.run(&mut source, &mut sink, &QuitSignal::new());
    assert_eq!(report.state, SessionState::Aborted);
    assert_eq!(report.frames_processed, 1);
}

#[test]
fn progress_line_uses_known_total() {
    let config = PipelineConfig {
        progress_every: 2,
        ..small_config()
    };
    let (p, log) = pipeline(config);
    let frames = (0..4).map(|_| gray(64, 48)).collect();
    let mut source = MemorySource::new(frames, Some(30.0));
    p.run(&mut source, &mut InMemorySink::new(), &QuitSignal::new());
    assert!(log.contains("Processing frame 2/4 (50%)"));
    assert!(log.contains("Processing frame 4/4 (100%)"));
}

#[test]
fn stage_timers_are_balanced() {
    let (p, log) = pipeline(small_config());
    let mut source = MemorySource::new(vec![gray(64, 48), gray(64, 48)], Some(30.0));
    p.run(&mut source, &mut InMemorySink::new(), &QuitSignal::new());
    assert_eq!(log.matching("PERF | IPM_Transform:"), 2);
    assert_eq!(log.matching("PERF | PIP_Overlay:"), 2);
    assert_eq!(log.matching("Timer not found"), 0);
}

#[test]
fn state_transitions_are_logged_at_debug() {
    let (p, log) = pipeline(small_config());
    let mut source = MemorySource::new(Vec::new(), Some(30.0));
    let report = p.run(&mut source, &mut InMemorySink::new(), &QuitSignal::new());
    assert_eq!(report.frames_read, 0);
    assert_eq!(report.averages, None);
    let debug: Vec<String> = log
        .records()
        .into_iter()
        .filter(|(s, _)| *s == Severity::Debug)
        .map(|(_, m)| m)
        .collect();
    assert!(debug.iter().any(|m| m == "Session state: Initializing -> Running"));
    assert!(debug.iter().any(|m| m == "Session state: Running -> Completed"));
}

#[test]
fn empty_image_directory_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.mp4");
    let input = InputSpec::Images {
        dir: dir.path().to_path_buf(),
        fps: 30.0,
    };
    let log = Arc::new(MemorySink::new());
    let telemetry = Arc::new(Telemetry::new(log.clone()));
    let report = process_input(
        &input,
        &out,
        &PipelineConfig::default(),
        telemetry,
        &QuitSignal::new(),
    );
    assert_eq!(report.state, SessionState::Aborted);
    assert_eq!(report.exit_code(), 1);
    assert!(!out.exists());
    assert!(log.contains("no valid image files found"));
}

#[test]
fn frame_buffer_report_sums_the_stage_buffers() {
    let (p, log) = pipeline(small_config());
    let size = p.config().frame_size;
    let placement = p.compositor.placement(size, size).unwrap();
    let expected = size.rgb8_len() * 2
        + FrameSize::new(64, 96).unwrap().rgb8_len()
        + placement.resized.rgb8_len()
        + placement.bordered.rgb8_len();
    assert_eq!(p.working_set_bytes(), expected);

    let mut source = MemorySource::new(vec![gray(64, 48)], Some(30.0));
    p.run(&mut source, &mut InMemorySink::new(), &QuitSignal::new());
    assert_eq!(log.matching("MEM | Frame buffer:"), 1);
}

#[test]
fn directory_source_info_reports_count_and_unreadable_entries() {
    let log = Arc::new(MemorySink::new());
    let telemetry = Telemetry::new(log.clone());
    let info = SourceInfo {
        kind: SourceKind::ImageSequence,
        description: "/data/seq".to_string(),
        nominal_fps: Some(10.0),
        total_frames: Some(12),
        native_size: None,
        unreadable_entries: vec!["permission denied".to_string()],
    };
    log_source_info(&telemetry, &info);

    assert!(log.contains("Found 12 image files in directory: /data/seq"));
    let warnings: Vec<String> = log
        .records()
        .into_iter()
        .filter(|(s, _)| *s == Severity::Warn)
        .map(|(_, m)| m)
        .collect();
    assert_eq!(warnings, ["Skipped unreadable entry in /data/seq: permission denied"]);
}

#[test]
fn image_session_logs_the_file_count_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["1.png", "2.png"] {
        gray(8, 6)
            .save_with_format(dir.path().join(name), image::ImageFormat::Png)
            .unwrap();
    }
    let input = InputSpec::Images {
        dir: dir.path().to_path_buf(),
        fps: 30.0,
    };
    let log = Arc::new(MemorySink::new());
    let telemetry = Arc::new(Telemetry::new(log.clone()));
    process_input(
        &input,
        &dir.path().join("out/bev.mp4"),
        &small_config(),
        telemetry,
        &QuitSignal::new(),
    );
    assert!(log.contains(&format!(
        "Found 2 image files in directory: {}",
        dir.path().display()
    )));
}
