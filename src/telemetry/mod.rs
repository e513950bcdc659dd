//! Logging and timing collaborator consumed by the pipeline.
//!
//! A [`Telemetry`] handle is created once per process and shared (`Arc`) with every stage.
//! Where events end up is decided by the [`TelemetrySink`] chosen at construction.

pub(crate) mod file;
pub(crate) mod handle;
pub(crate) mod sink;

pub use file::{FileSink, format_log_line};
pub use handle::{
    Telemetry, duration_ms, format_count, format_frame_rate, format_memory, format_performance,
};
pub use sink::{MemorySink, NullSink, Severity, TelemetrySink, TracingSink};
