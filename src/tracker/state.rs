//! Registry of tracked instruments shared by the tracker tasks.
//!
//! The refresher (and `stop`) are the only writers. Refresh cycles are
//! serialized by an async lock, so an on-demand refresh never interleaves
//! with the periodic one. Routers and the trade emitter take short read locks
//! to look an instrument up; no registry lock is ever held across an `.await`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::orderbook::BookHandle;
use crate::types::{BookMessage, MessageKind};

use super::data_source::TrackerEntry;
use super::stats::TrackerStats;
use super::worker::BookWorker;

/// Result of offering a message to an instrument's inbound queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Queued for the worker
    Accepted,
    /// No worker registered for the instrument
    Unknown,
    /// Update id not newer than the book's baseline
    Stale,
    /// Queue full; dropped and a resnapshot requested
    Overflow,
}

/// Everything the tracker keeps for one instrument
#[derive(Debug)]
struct TrackedBook {
    book: BookHandle,
    queue: mpsc::Sender<BookMessage>,
    /// Set once a resync request is published; cleared by the next applied snapshot
    resync_pending: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl TrackedBook {
    fn is_live(&self) -> bool {
        self.worker.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

#[derive(Debug)]
pub(crate) struct TrackerState {
    config: TrackerConfig,
    books: RwLock<FxHashMap<String, TrackedBook>>,
    stats: TrackerStats,
    resync_tx: mpsc::UnboundedSender<String>,
    refresh_cycle: Mutex<()>,
}

impl TrackerState {
    pub(crate) fn new(config: TrackerConfig, resync_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            config,
            books: RwLock::new(FxHashMap::default()),
            stats: TrackerStats::default(),
            resync_tx,
            refresh_cycle: Mutex::new(()),
        }
    }

    pub(crate) fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub(crate) fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    /// Exclusive right to run a refresh cycle, held until the guard drops
    pub(crate) async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh_cycle.lock().await
    }

    /// Offer `message` to its instrument's inbound queue without blocking.
    ///
    /// With `check_stale`, messages whose update id is not newer than the
    /// book's baseline are turned away before queueing.
    pub(crate) fn dispatch(&self, message: BookMessage, check_stale: bool) -> Result<Dispatch, Error> {
        let books = self.books.read();
        let Some(entry) = books.get(message.instrument()) else {
            return Ok(Dispatch::Unknown);
        };

        if check_stale {
            if let Some(update_id) = message.update_id() {
                if update_id <= entry.book.snapshot_uid() {
                    return Ok(Dispatch::Stale);
                }
            }
        }

        match entry.queue.try_send(message) {
            Ok(()) => Ok(Dispatch::Accepted),
            Err(TrySendError::Full(message)) => {
                self.stats.queue_overflow();
                // A dropped snapshot leaves the gap open, so ask again
                let repeat = message.kind() == MessageKind::Snapshot;
                self.request_resync(message.instrument(), &entry.resync_pending, repeat);
                Ok(Dispatch::Overflow)
            }
            Err(TrySendError::Closed(message)) => {
                Err(Error::QueueClosed(message.instrument().to_string()))
            }
        }
    }

    /// Publish a resync request unless one is already outstanding.
    ///
    /// `repeat` publishes even when one is outstanding.
    fn request_resync(&self, instrument: &str, pending: &AtomicBool, repeat: bool) {
        if pending.swap(true, Ordering::AcqRel) {
            if !repeat {
                return;
            }
            warn!(instrument, "Snapshot dropped on a full inbound queue, requesting another");
        } else {
            warn!(instrument, "Inbound queue full, dropping messages and requesting a new snapshot");
        }
        // Nobody listening is fine; the flag still records the gap.
        let _ = self.resync_tx.send(instrument.to_string());
    }

    pub(crate) fn book(&self, instrument: &str) -> Option<BookHandle> {
        self.books.read().get(instrument).map(|e| e.book.clone())
    }

    pub(crate) fn order_books(&self) -> FxHashMap<String, BookHandle> {
        self.books
            .read()
            .iter()
            .map(|(instrument, e)| (instrument.clone(), e.book.clone()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.books.read().len()
    }

    /// Every registered instrument, live worker or not
    pub(crate) fn instruments(&self) -> Vec<String> {
        self.books.read().keys().cloned().collect()
    }

    /// Instruments whose worker has not terminated
    pub(crate) fn tracked_instruments(&self) -> FxHashSet<String> {
        self.books
            .read()
            .iter()
            .filter(|(_, e)| e.is_live())
            .map(|(instrument, _)| instrument.clone())
            .collect()
    }

    /// Register the entry's book, create its queue and spawn its worker.
    ///
    /// Replaces (and cancels) any previous registration for the instrument.
    /// Must be called from within a Tokio runtime.
    pub(crate) fn start_tracking(&self, entry: TrackerEntry) {
        let TrackerEntry {
            instrument,
            order_book,
            ..
        } = entry;

        let (queue, inbox) = mpsc::channel(self.config.queue_capacity());
        let book = BookHandle::new(order_book);
        let resync_pending = Arc::new(AtomicBool::new(false));

        let worker = BookWorker::new(
            instrument.clone(),
            book.clone(),
            inbox,
            Arc::clone(&resync_pending),
            &self.config,
        );
        let handle = tokio::spawn(worker.run());

        let previous = self.books.write().insert(
            instrument.clone(),
            TrackedBook {
                book,
                queue,
                resync_pending,
                worker: Some(handle),
            },
        );
        if let Some(worker) = previous.and_then(|p| p.worker) {
            worker.abort();
        }
        info!(instrument = %instrument, "Started order book tracking");
    }

    /// Cancel the instrument's worker and drop its book and queue.
    pub(crate) fn stop_tracking(&self, instrument: &str) -> bool {
        let removed = self.books.write().remove(instrument);
        match removed {
            Some(entry) => {
                if let Some(worker) = entry.worker {
                    worker.abort();
                }
                info!(instrument, "Stopped order book tracking");
                true
            }
            None => false,
        }
    }

    /// Detach every worker handle, leaving the books readable
    pub(crate) fn take_workers(&self) -> Vec<JoinHandle<()>> {
        self.books
            .write()
            .values_mut()
            .filter_map(|e| e.worker.take())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::OrderBook;
    use crate::types::BookUpdate;

    fn state_with_capacity(capacity: usize) -> (TrackerState, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = TrackerConfig::new().with_queue_capacity(capacity);
        (TrackerState::new(config, tx), rx)
    }

    fn entry(instrument: &str, update_id: u64) -> TrackerEntry {
        let snapshot = BookUpdate::new(instrument, update_id, 0);
        TrackerEntry::new(OrderBook::from_snapshot(&snapshot), 0)
    }

    #[tokio::test]
    async fn test_dispatch_unknown_and_stale() {
        let (state, _rx) = state_with_capacity(8);
        state.start_tracking(entry("A", 10));

        let unknown = BookUpdate::new("B", 11, 0).into_diff();
        assert_eq!(state.dispatch(unknown, true).unwrap(), Dispatch::Unknown);

        let stale = BookUpdate::new("A", 10, 0).into_diff();
        assert_eq!(state.dispatch(stale, true).unwrap(), Dispatch::Stale);

        // Snapshots skip the staleness check
        let old_snapshot = BookUpdate::new("A", 3, 0).into_snapshot();
        assert_eq!(
            state.dispatch(old_snapshot, false).unwrap(),
            Dispatch::Accepted
        );
    }

    // The current-thread test runtime never polls the worker while this test
    // runs synchronously, so the queue fills deterministically.
    #[tokio::test]
    async fn test_overflow_requests_one_resync() {
        let (state, mut resync_rx) = state_with_capacity(2);
        state.start_tracking(entry("A", 0));

        let outcomes: Vec<Dispatch> = (1..=5)
            .map(|id| {
                state
                    .dispatch(BookUpdate::new("A", id, 0).into_diff(), true)
                    .unwrap()
            })
            .collect();

        assert_eq!(
            outcomes,
            vec![
                Dispatch::Accepted,
                Dispatch::Accepted,
                Dispatch::Overflow,
                Dispatch::Overflow,
                Dispatch::Overflow,
            ]
        );
        assert_eq!(state.stats().snapshot().queue_overflows, 3);
        assert_eq!(resync_rx.try_recv().unwrap(), "A");
        assert!(resync_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_snapshot_requests_again() {
        let (state, mut resync_rx) = state_with_capacity(1);
        state.start_tracking(entry("A", 0));

        let first = state.dispatch(BookUpdate::new("A", 1, 0).into_diff(), true).unwrap();
        let second = state.dispatch(BookUpdate::new("A", 2, 0).into_diff(), true).unwrap();
        assert_eq!((first, second), (Dispatch::Accepted, Dispatch::Overflow));
        assert_eq!(resync_rx.try_recv().unwrap(), "A");

        // The answer to the request does not fit either
        let snapshot = BookUpdate::new("A", 5, 0).into_snapshot();
        assert_eq!(state.dispatch(snapshot, false).unwrap(), Dispatch::Overflow);
        assert_eq!(resync_rx.try_recv().unwrap(), "A");

        // Diffs alone do not repeat the request
        let third = state.dispatch(BookUpdate::new("A", 3, 0).into_diff(), true).unwrap();
        assert_eq!(third, Dispatch::Overflow);
        assert!(resync_rx.try_recv().is_err());
        assert_eq!(state.stats().snapshot().queue_overflows, 3);
    }

    #[tokio::test]
    async fn test_refresh_lock_is_exclusive() {
        let (state, _rx) = state_with_capacity(8);
        let guard = state.lock_refresh().await;
        assert!(state.refresh_cycle.try_lock().is_err());

        drop(guard);
        assert!(state.refresh_cycle.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_stop_tracking_closes_queue() {
        let (state, _rx) = state_with_capacity(8);
        state.start_tracking(entry("A", 0));
        assert!(state.tracked_instruments().contains("A"));

        assert!(state.stop_tracking("A"));
        assert!(!state.stop_tracking("A"));
        assert!(state.book("A").is_none());
        assert_eq!(state.len(), 0);
    }

    #[tokio::test]
    async fn test_take_workers_keeps_books() {
        let (state, _rx) = state_with_capacity(8);
        state.start_tracking(entry("A", 0));
        state.start_tracking(entry("B", 0));

        let workers = state.take_workers();
        assert_eq!(workers.len(), 2);
        for worker in &workers {
            worker.abort();
        }

        assert!(state.tracked_instruments().is_empty());
        assert_eq!(state.order_books().len(), 2);
    }
}
