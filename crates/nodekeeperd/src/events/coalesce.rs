//! Rate limiting of transaction activity into periodic bursts.

use std::mem;
use std::time::{Duration, Instant};

/// Accumulates notification arrivals and releases them at most once per
/// interval.
///
/// The first arrival is released immediately. Later arrivals accumulate until
/// one lands at least `min_interval` after the previous release, at which
/// point the whole accumulated count is released and the counter resets.
#[derive(Debug, Clone)]
pub struct ActivityCoalescer {
    min_interval: Duration,
    pending: u64,
    last_release: Option<Instant>,
}

impl ActivityCoalescer {
    /// Builds a coalescer releasing at most once per `min_interval`.
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            pending: 0,
            last_release: None,
        }
    }

    /// Records one arrival at `now`, returning the count to publish when due.
    pub fn record(&mut self, now: Instant) -> Option<u64> {
        self.pending = self.pending.saturating_add(1);
        let due = self
            .last_release
            .is_none_or(|last| now.saturating_duration_since(last) >= self.min_interval);
        if !due {
            return None;
        }
        self.last_release = Some(now);
        Some(mem::take(&mut self.pending))
    }

    /// Arrivals recorded since the last release.
    #[must_use]
    pub const fn pending(&self) -> u64 {
        self.pending
    }
}
