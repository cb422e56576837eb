//! Bounded buffer of recent node output.

use std::collections::VecDeque;

/// Number of output lines retained for crash reports.
pub const LOG_RING_CAPACITY: usize = 200;

/// Keeps the most recent non-empty output lines, oldest first.
#[derive(Debug, Clone)]
pub struct LogRing {
    capacity: usize,
    lines: VecDeque<String>,
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new(LOG_RING_CAPACITY)
    }
}

impl LogRing {
    /// Builds an empty ring holding at most `capacity` lines.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: VecDeque::with_capacity(capacity),
        }
    }

    /// Records `line` after trimming; blank lines are ignored.
    pub fn push(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() || self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(trimmed.to_owned());
    }

    /// Copies the retained lines, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// Forgets every retained line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Number of retained lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` when nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
