use std::sync::{Mutex, PoisonError};

/// Severity attached to every telemetry event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Per-frame diagnostics.
    Debug,
    /// Normal progress and metric reports.
    Info,
    /// Recoverable anomalies and real-time budget overruns.
    Warn,
    /// Stage failures and session aborts.
    Error,
    /// Unrecoverable conditions.
    Critical,
}

impl Severity {
    /// Fixed-width tag used in log lines.
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO ",
            Severity::Warn => "WARN ",
            Severity::Error => "ERROR",
            Severity::Critical => "CRIT ",
        }
    }
}

/// Destination for telemetry events.
///
/// Implementations must serialize concurrent `emit` calls themselves.
pub trait TelemetrySink: Send + Sync {
    /// Record one event.
    fn emit(&self, severity: Severity, message: &str);
}

/// Forwards events to `tracing` (console output is configured by the subscriber).
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(target: "birdview", "{message}"),
            Severity::Info => tracing::info!(target: "birdview", "{message}"),
            Severity::Warn => tracing::warn!(target: "birdview", "{message}"),
            Severity::Error => tracing::error!(target: "birdview", "{message}"),
            Severity::Critical => {
                tracing::error!(target: "birdview", critical = true, "{message}")
            }
        }
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn emit(&self, _severity: Severity, _message: &str) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events.
    pub fn records(&self) -> Vec<(Severity, String)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return `true` when any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(_, m)| m.contains(needle))
    }

    /// Number of recorded messages containing `needle`.
    pub fn matching(&self, needle: &str) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, m)| m.contains(needle))
            .count()
    }

    /// Number of events recorded at `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&self, severity: Severity, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((severity, message.to_string()));
    }
}
