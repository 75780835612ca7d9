//! Bounded history of recent diffs for one instrument.

use std::collections::VecDeque;

use crate::types::BookUpdate;

/// Most recent diffs applied to a book, oldest first.
///
/// When a snapshot lands the worker hands this window to
/// [`OrderBook::restore_from_snapshot`](super::OrderBook::restore_from_snapshot)
/// so diffs that arrived while the snapshot was in flight are re-applied.
#[derive(Debug, Clone)]
pub struct DiffWindow {
    diffs: VecDeque<BookUpdate>,
    capacity: usize,
}

impl DiffWindow {
    /// Create an empty window holding at most `capacity` diffs
    pub fn new(capacity: usize) -> Self {
        Self {
            diffs: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a diff, evicting the oldest entries beyond capacity
    pub fn push(&mut self, diff: BookUpdate) {
        self.diffs.push_back(diff);
        while self.diffs.len() > self.capacity {
            self.diffs.pop_front();
        }
    }

    /// Iterate in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &BookUpdate> + '_ {
        self.diffs.iter()
    }

    /// Number of buffered diffs
    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    /// Check if no diffs are buffered
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// Maximum number of buffered diffs
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
