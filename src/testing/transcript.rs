//! Per-test output sink
//!
//! Holds everything one test sent, received and logged, in order. The
//! output pump and the script both write here, so it is cheap to clone and
//! safe to share across tasks.

use std::sync::{Arc, Mutex, MutexGuard};

/// Ordered log of one test run
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a line
    pub fn write_line(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::trace!(target: "conformance::transcript", "{}", line);
        self.guard().push(line);
    }

    /// Record a line sent to the debugger
    pub fn sent(&self, text: &str) {
        self.write_line(format!("< {text}"));
    }

    /// Record a line received from the debugger
    pub fn received(&self, text: &str) {
        self.write_line(format!("> {text}"));
    }

    /// Snapshot of all lines so far
    pub fn lines(&self) -> Vec<String> {
        self.guard().clone()
    }

    /// All lines joined with newlines
    pub fn contents(&self) -> String {
        self.guard().join("\n")
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_lines() {
        let transcript = Transcript::new();
        let pump_side = transcript.clone();
        transcript.sent("1-exec-run");
        pump_side.received("1^running");
        transcript.write_line("note");
        assert_eq!(
            transcript.lines(),
            vec!["< 1-exec-run", "> 1^running", "note"]
        );
        assert_eq!(pump_side.contents(), "< 1-exec-run\n> 1^running\nnote");
    }
}
