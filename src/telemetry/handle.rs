use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::telemetry::sink::{NullSink, Severity, TelemetrySink};

/// Logging and timing handle shared by the pipeline stages.
///
/// Owns the sink and the named-timer map; both are safe to use from several threads.
pub struct Telemetry {
    sink: Arc<dyn TelemetrySink>,
    timers: Mutex<HashMap<String, Instant>>,
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry").finish_non_exhaustive()
    }
}

impl Telemetry {
    /// Build a handle writing to `sink`.
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            sink,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Handle that discards all events.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Emit a plain message.
    pub fn log(&self, severity: Severity, message: impl AsRef<str>) {
        self.sink.emit(severity, message.as_ref());
    }

    /// Emit at [`Severity::Debug`].
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Severity::Debug, message);
    }

    /// Emit at [`Severity::Info`].
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Severity::Info, message);
    }

    /// Emit at [`Severity::Warn`].
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Severity::Warn, message);
    }

    /// Emit at [`Severity::Error`].
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Severity::Error, message);
    }

    /// Emit at [`Severity::Critical`].
    pub fn critical(&self, message: impl AsRef<str>) {
        self.log(Severity::Critical, message);
    }

    /// Start (or restart) the named timer `operation`.
    pub fn start_timer(&self, operation: &str) {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation.to_string(), Instant::now());
    }

    /// Stop the named timer, report its duration and return it.
    ///
    /// A timer that was never started is reported as a warning and yields `None`.
    pub fn end_timer(&self, operation: &str) -> Option<Duration> {
        let end = Instant::now();
        let started = self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(operation);

        match started {
            Some(start) => {
                let elapsed = end.duration_since(start);
                self.log_performance(operation, duration_ms(elapsed), "ms");
                Some(elapsed)
            }
            None => {
                self.warn(format!("Timer not found for operation: {operation}"));
                None
            }
        }
    }

    /// Number of timers currently running.
    pub fn active_timers(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Report a metric value, e.g. `PERF | Avg IPM Time: 4.210ms`.
    pub fn log_performance(&self, operation: &str, value: f64, unit: &str) {
        self.info(format_performance(operation, value, unit));
    }

    /// Report an integral metric, e.g. `PERF | Total Frames Processed: 3 frames`.
    pub fn log_count(&self, operation: &str, count: u64, unit: &str) {
        self.info(format_count(operation, count, unit));
    }

    /// Report a memory figure in megabytes.
    pub fn log_memory_usage(&self, context: &str, bytes: usize) {
        self.info(format_memory(context, bytes));
    }

    /// Report the current processing rate.
    pub fn log_frame_rate(&self, fps: f64) {
        self.info(format_frame_rate(fps));
    }
}

/// Duration in fractional milliseconds.
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// `PERF | <operation>: <value with 3 decimals><unit>`
pub fn format_performance(operation: &str, value: f64, unit: &str) -> String {
    format!("PERF | {operation}: {value:.3}{unit}")
}

/// `PERF | <operation>: <count><unit>`
pub fn format_count(operation: &str, count: u64, unit: &str) -> String {
    format!("PERF | {operation}: {count}{unit}")
}

/// `MEM | <context>: <megabytes with 2 decimals>MB`
pub fn format_memory(context: &str, bytes: usize) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    format!("MEM | {context}: {mb:.2}MB")
}

/// `FPS | Current frame rate: <fps with 1 decimal> fps`
pub fn format_frame_rate(fps: f64) -> String {
    format!("FPS | Current frame rate: {fps:.1} fps")
}

#[cfg(test)]
#[path = "../../tests/unit/telemetry/handle.rs"]
mod tests;
