use std::{
    fs::{File, OpenOptions},
    io::Write as _,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use anyhow::Context as _;
use chrono::{DateTime, Local};

use crate::{
    foundation::error::BirdviewResult,
    telemetry::sink::{Severity, TelemetrySink, TracingSink},
};

/// Append-only text log mirrored to the console through [`TracingSink`].
///
/// Line shape: `[YYYY-MM-DD HH:MM:SS.mmm] LEVEL: message`.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Option<Mutex<File>>,
    console: TracingSink,
}

impl FileSink {
    /// Open (or create) `path` in append mode.
    pub fn open(path: impl Into<PathBuf>) -> BirdviewResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create log directory '{}'", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file '{}'", path.display()))?;
        Ok(Self {
            path,
            file: Some(Mutex::new(file)),
            console: TracingSink,
        })
    }

    /// Like [`FileSink::open`], but degrades to console-only output when the file cannot be opened.
    pub fn open_or_console(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(path.clone()) {
            Ok(sink) => sink,
            Err(e) => {
                eprintln!("Error opening log file {}: {e}", path.display());
                Self {
                    path,
                    file: None,
                    console: TracingSink,
                }
            }
        }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return `true` when events reach the log file.
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }
}

impl TelemetrySink for FileSink {
    fn emit(&self, severity: Severity, message: &str) {
        self.console.emit(severity, message);

        let Some(file) = self.file.as_ref() else {
            return;
        };
        let line = format_log_line(&Local::now(), severity, message);
        let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
        // Write failures are dropped.
        let _ = file.write_all(line.as_bytes()).and_then(|_| file.flush());
    }
}

/// Format one log line, newline included.
pub fn format_log_line(at: &DateTime<Local>, severity: Severity, message: &str) -> String {
    format!(
        "[{}] {}: {}\n",
        at.format("%Y-%m-%d %H:%M:%S%.3f"),
        severity.tag(),
        message
    )
}
