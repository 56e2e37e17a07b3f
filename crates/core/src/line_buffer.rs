// crates/core/src/line_buffer.rs
//! Bounded, drain-on-read log of status lines for a single job.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Maximum number of buffered lines per job.
pub const DEFAULT_LINE_CAP: usize = 500;

/// Append-only status log that is emptied by every poll.
///
/// Consecutive duplicates are collapsed; once `cap` is exceeded the oldest
/// entries are discarded. `push` and `drain` are each atomic, so a reader
/// task and a poller may use the buffer concurrently.
#[derive(Debug)]
pub struct LineBuffer {
    cap: usize,
    lines: Mutex<VecDeque<String>>,
}

impl LineBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            lines: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a line. Returns `false` if it was empty or repeated the
    /// previous entry.
    pub fn push(&self, line: impl AsRef<str>) -> bool {
        let line = line.as_ref().trim();
        if line.is_empty() {
            return false;
        }
        let mut lines = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if lines.back().is_some_and(|last| last == line) {
            return false;
        }
        lines.push_back(line.to_string());
        while lines.len() > self.cap {
            lines.pop_front();
        }
        true
    }

    /// Take every buffered line, leaving the buffer empty.
    pub fn drain(&self) -> Vec<String> {
        let mut lines = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_drain_empties_buffer() {
        let buf = LineBuffer::default();
        buf.push("[start] go");
        buf.push("[progress] frame=25");

        assert_eq!(buf.drain(), vec!["[start] go", "[progress] frame=25"]);
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn test_consecutive_duplicates_collapse() {
        let buf = LineBuffer::default();
        assert!(buf.push("[progress] frame=25"));
        assert!(!buf.push("[progress] frame=25"));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_non_consecutive_duplicates_are_kept() {
        let buf = LineBuffer::default();
        buf.push("[alert] fight");
        buf.push("[progress] frame=50");
        buf.push("[alert] fight");
        assert_eq!(buf.drain().len(), 3);
    }

    #[test]
    fn test_duplicate_check_survives_drain_boundary_only_within_buffer() {
        let buf = LineBuffer::default();
        buf.push("[info] same");
        buf.drain();
        // Nothing left to compare against.
        assert!(buf.push("[info] same"));
    }

    #[test]
    fn test_lines_are_trimmed_and_blank_lines_dropped() {
        let buf = LineBuffer::default();
        assert!(buf.push("  [info] padded \r\n"));
        assert!(!buf.push("   "));
        assert!(!buf.push("[info] padded"));
        assert_eq!(buf.drain(), vec!["[info] padded"]);
    }

    #[test]
    fn test_cap_discards_oldest() {
        let buf = LineBuffer::new(3);
        for i in 0..5 {
            buf.push(format!("[progress] frame={i}"));
        }
        assert_eq!(
            buf.drain(),
            vec![
                "[progress] frame=2",
                "[progress] frame=3",
                "[progress] frame=4"
            ]
        );
    }

    #[test]
    fn test_default_cap_is_500() {
        let buf = LineBuffer::default();
        for i in 0..600 {
            buf.push(format!("[progress] frame={i}"));
        }
        let lines = buf.drain();
        assert_eq!(lines.len(), DEFAULT_LINE_CAP);
        assert_eq!(lines[0], "[progress] frame=100");
    }

    #[test]
    fn test_concurrent_push_and_drain_never_duplicates() {
        let buf = Arc::new(LineBuffer::new(10_000));
        let writer = {
            let buf = Arc::clone(&buf);
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    buf.push(format!("[progress] frame={i}"));
                }
            })
        };
        let mut seen = Vec::new();
        while !writer.is_finished() {
            seen.extend(buf.drain());
        }
        writer.join().unwrap();
        seen.extend(buf.drain());

        assert_eq!(seen.len(), 2_000);
        let mut sorted = seen.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), seen.len());
    }
}
