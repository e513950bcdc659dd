use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::telemetry::{Telemetry, duration_ms};

/// Per-stage durations of one successfully processed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTiming {
    /// Pull to write, end to end.
    pub total: Duration,
    /// Bird's-eye warp.
    pub ipm: Duration,
    /// Overlay composite.
    pub pip: Duration,
}

/// Mean stage durations in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageAverages {
    /// Mean of [`FrameTiming::total`].
    pub total_ms: f64,
    /// Mean of [`FrameTiming::ipm`].
    pub ipm_ms: f64,
    /// Mean of [`FrameTiming::pip`].
    pub pip_ms: f64,
}

/// Cumulative counters for one session.
///
/// Every `rate_every` frames the current frame rate and running averages are reported.
#[derive(Debug)]
pub struct PerformanceTracker {
    telemetry: Arc<Telemetry>,
    rate_every: u64,
    frame_count: u64,
    total_ms: f64,
    ipm_ms: f64,
    pip_ms: f64,
    last_rate_report: Instant,
}

impl PerformanceTracker {
    /// Tracker reporting to `telemetry` every `rate_every` frames (at least 1).
    pub fn new(telemetry: Arc<Telemetry>, rate_every: u64) -> Self {
        Self {
            telemetry,
            rate_every: rate_every.max(1),
            frame_count: 0,
            total_ms: 0.0,
            ipm_ms: 0.0,
            pip_ms: 0.0,
            last_rate_report: Instant::now(),
        }
    }

    /// Frames recorded so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Averages so far, or `None` before the first frame.
    pub fn averages(&self) -> Option<StageAverages> {
        (self.frame_count > 0).then(|| {
            let n = self.frame_count as f64;
            StageAverages {
                total_ms: self.total_ms / n,
                ipm_ms: self.ipm_ms / n,
                pip_ms: self.pip_ms / n,
            }
        })
    }

    /// Account one processed frame.
    pub fn record(&mut self, timing: FrameTiming) {
        self.frame_count += 1;
        self.total_ms += duration_ms(timing.total);
        self.ipm_ms += duration_ms(timing.ipm);
        self.pip_ms += duration_ms(timing.pip);

        if self.frame_count.is_multiple_of(self.rate_every) {
            let now = Instant::now();
            let window_ms = duration_ms(now.duration_since(self.last_rate_report));
            if window_ms > 0.0 {
                self.telemetry
                    .log_frame_rate(self.rate_every as f64 * 1000.0 / window_ms);
            }
            self.log_averages("Avg");
            self.last_rate_report = now;
        }
    }

    /// Final report. The frame total is always logged; averages only when frames were processed.
    pub fn log_summary(&self) {
        self.telemetry.info("=== Performance Summary ===");
        self.telemetry
            .log_count("Total Frames Processed", self.frame_count, " frames");
        self.log_averages("Average");
    }

    fn log_averages(&self, prefix: &str) {
        let Some(avg) = self.averages() else {
            return;
        };
        self.telemetry
            .log_performance(&format!("{prefix} Processing Time"), avg.total_ms, "ms");
        self.telemetry
            .log_performance(&format!("{prefix} IPM Time"), avg.ipm_ms, "ms");
        self.telemetry
            .log_performance(&format!("{prefix} PIP Time"), avg.pip_ms, "ms");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/perf.rs"]
mod tests;
