use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag, polled once per frame.
#[derive(Clone, Debug, Default)]
pub struct QuitSignal(Arc<AtomicBool>);

impl QuitSignal {
    /// Unraised signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise the signal when a `q` line arrives on stdin.
    ///
    /// The watcher thread is detached; it ends with stdin or once the signal is raised.
    pub fn watch_stdin(&self) -> std::io::Result<()> {
        let signal = self.clone();
        std::thread::Builder::new()
            .name("birdview-quit-key".to_string())
            .spawn(move || signal.watch_lines(std::io::stdin().lock()))?;
        Ok(())
    }

    /// Consume `reader` line by line until a quit line is seen or input ends.
    pub fn watch_lines(&self, reader: impl BufRead) {
        for line in reader.lines() {
            let Ok(line) = line else {
                break;
            };
            if is_quit_line(&line) {
                self.raise();
                break;
            }
        }
    }
}

fn is_quit_line(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/cancel.rs"]
mod tests;
