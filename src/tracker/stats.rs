//! Message counters.
//!
//! [`WindowCounters`] back the periodic accepted/rejected log lines of each
//! task and reset after every report. [`TrackerStats`] holds lifetime totals
//! that callers can read at any time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Accepted/rejected counts since the last report
#[derive(Debug)]
pub(crate) struct WindowCounters {
    accepted: u64,
    rejected: u64,
    last_report: Instant,
    interval: Duration,
}

impl WindowCounters {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            accepted: 0,
            rejected: 0,
            last_report: Instant::now(),
            interval,
        }
    }

    pub(crate) fn accept(&mut self) {
        self.accepted += 1;
    }

    pub(crate) fn reject(&mut self) {
        self.rejected += 1;
    }

    /// Returns `(accepted, rejected)` and resets, at most once per interval.
    pub(crate) fn take_report(&mut self, now: Instant) -> Option<(u64, u64)> {
        if now.duration_since(self.last_report) < self.interval {
            return None;
        }
        let report = (self.accepted, self.rejected);
        self.accepted = 0;
        self.rejected = 0;
        self.last_report = now;
        Some(report)
    }
}

/// Lifetime counters shared by every tracker task
#[derive(Debug, Default)]
pub struct TrackerStats {
    diffs_accepted: AtomicU64,
    diffs_rejected: AtomicU64,
    snapshots_routed: AtomicU64,
    snapshots_dropped: AtomicU64,
    trades_accepted: AtomicU64,
    trades_rejected: AtomicU64,
    queue_overflows: AtomicU64,
}

/// Point-in-time copy of the tracker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Diffs forwarded to a worker queue
    pub diffs_accepted: u64,
    /// Diffs dropped as stale or for an untracked instrument
    pub diffs_rejected: u64,
    /// Snapshots forwarded to a worker queue
    pub snapshots_routed: u64,
    /// Snapshots dropped for an untracked instrument
    pub snapshots_dropped: u64,
    /// Trades applied to a book
    pub trades_accepted: u64,
    /// Trades dropped for an untracked instrument
    pub trades_rejected: u64,
    /// Diffs or snapshots dropped because a worker queue was full
    pub queue_overflows: u64,
}

impl TrackerStats {
    pub(crate) fn diff_accepted(&self) {
        self.diffs_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn diff_rejected(&self) {
        self.diffs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot_routed(&self) {
        self.snapshots_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot_dropped(&self) {
        self.snapshots_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn trade_accepted(&self) {
        self.trades_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn trade_rejected(&self) {
        self.trades_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn queue_overflow(&self) {
        self.queue_overflows.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            diffs_accepted: self.diffs_accepted.load(Ordering::Relaxed),
            diffs_rejected: self.diffs_rejected.load(Ordering::Relaxed),
            snapshots_routed: self.snapshots_routed.load(Ordering::Relaxed),
            snapshots_dropped: self.snapshots_dropped.load(Ordering::Relaxed),
            trades_accepted: self.trades_accepted.load(Ordering::Relaxed),
            trades_rejected: self.trades_rejected.load(Ordering::Relaxed),
            queue_overflows: self.queue_overflows.load(Ordering::Relaxed),
        }
    }
}
