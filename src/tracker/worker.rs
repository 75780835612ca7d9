//! Per-instrument worker: applies queued diffs and snapshots in arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::orderbook::{BookHandle, DiffWindow};
use crate::types::{BookMessage, MessageKind};

use super::recover;
use super::stats::WindowCounters;

/// Owns one instrument's inbound queue and reconciliation window.
///
/// The worker is the only writer of its book's levels (trades only touch
/// trade-derived state), so messages are applied strictly in queue order.
#[derive(Debug)]
pub(crate) struct BookWorker {
    instrument: String,
    book: BookHandle,
    inbox: mpsc::Receiver<BookMessage>,
    window: DiffWindow,
    resync_pending: Arc<AtomicBool>,
    counters: WindowCounters,
    retry_delay: Duration,
}

impl BookWorker {
    pub(crate) fn new(
        instrument: String,
        book: BookHandle,
        inbox: mpsc::Receiver<BookMessage>,
        resync_pending: Arc<AtomicBool>,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            instrument,
            book,
            inbox,
            window: DiffWindow::new(config.diff_window_size()),
            resync_pending,
            counters: WindowCounters::new(config.stats_interval()),
            retry_delay: config.retry_delay(),
        }
    }

    /// Drain the inbound queue until it closes or the task is aborted.
    pub(crate) async fn run(mut self) {
        while let Some(message) = self.inbox.recv().await {
            if let Err(err) = self.handle(message) {
                recover("book worker", &err, self.retry_delay).await;
            }
        }
        debug!(instrument = %self.instrument, "Inbound queue closed");
    }

    pub(crate) fn handle(&mut self, message: BookMessage) -> Result<(), Error> {
        match message {
            BookMessage::Diff(diff) => {
                {
                    let mut book = self.book.write();
                    // The book can advance between routing and this point.
                    if diff.update_id <= book.snapshot_uid() {
                        trace!(
                            instrument = %self.instrument,
                            update_id = diff.update_id,
                            snapshot_uid = book.snapshot_uid(),
                            "Skipping stale diff"
                        );
                        self.counters.reject();
                        return Ok(());
                    }
                    book.apply_diff(&diff.bids, &diff.asks, diff.update_id);
                }
                self.window.push(diff);
                debug_assert!(self.window.len() <= self.window.capacity());
                self.counters.accept();

                if let Some((applied, stale)) = self.counters.take_report(Instant::now()) {
                    debug!(
                        instrument = %self.instrument,
                        applied,
                        stale,
                        "Processed order book diffs"
                    );
                }
                Ok(())
            }
            BookMessage::Snapshot(snapshot) => {
                let uid = {
                    let mut book = self.book.write();
                    book.restore_from_snapshot(&snapshot, self.window.iter());
                    book.snapshot_uid()
                };
                self.resync_pending.store(false, Ordering::Release);
                if self.window.is_empty() {
                    trace!(instrument = %self.instrument, "Snapshot applied with no buffered diffs");
                }
                debug!(
                    instrument = %self.instrument,
                    snapshot_id = snapshot.update_id,
                    snapshot_uid = uid,
                    buffered = self.window.len(),
                    "Processed order book snapshot"
                );
                Ok(())
            }
            BookMessage::Trade(_) => Err(Error::UnexpectedMessage {
                stream: "inbound",
                kind: MessageKind::Trade,
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn window(&self) -> &DiffWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::OrderBook;
    use crate::types::{BookUpdate, TradeSide, TradeUpdate};

    fn worker(book: &BookHandle) -> (BookWorker, mpsc::Sender<BookMessage>) {
        let (tx, rx) = mpsc::channel(64);
        let worker = BookWorker::new(
            "TEST".to_string(),
            book.clone(),
            rx,
            Arc::new(AtomicBool::new(true)),
            &TrackerConfig::default(),
        );
        (worker, tx)
    }

    fn diff(update_id: u64, bids: Vec<(u64, u64)>) -> BookMessage {
        BookUpdate::new("TEST", update_id, 0).with_bids(bids).into_diff()
    }

    #[tokio::test]
    async fn test_snapshot_reconciles_buffered_diffs() {
        let book = BookHandle::new(OrderBook::new("TEST"));
        let (mut worker, _tx) = worker(&book);

        worker.handle(diff(5, vec![(10, 5)])).unwrap();
        worker.handle(diff(6, vec![(11, 6)])).unwrap();
        worker.handle(diff(7, vec![(12, 7)])).unwrap();
        worker.handle(diff(8, vec![(13, 8)])).unwrap();

        let snapshot = BookUpdate::new("TEST", 6, 0)
            .with_bids(vec![(1, 1)])
            .into_snapshot();
        worker.handle(snapshot).unwrap();

        // snapshot(6) + diffs 7 and 8; diff 5 is not replayed
        assert_eq!(book.snapshot().bids, vec![(13, 8), (12, 7), (1, 1)]);
        assert_eq!(book.snapshot_uid(), 8);
        assert!(!worker.resync_pending.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_window_is_bounded() {
        let book = BookHandle::new(OrderBook::new("TEST"));
        let (mut worker, _tx) = worker(&book);

        for id in 1..=50 {
            worker.handle(diff(id, vec![])).unwrap();
            assert!(worker.window().len() <= 32);
        }

        let ids: Vec<u64> = worker.window().iter().map(|d| d.update_id).collect();
        assert_eq!(ids, (19..=50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_stale_diff_is_not_applied_or_buffered() {
        let book = BookHandle::new(OrderBook::new("TEST"));
        let (mut worker, _tx) = worker(&book);

        worker.handle(diff(4, vec![(10, 1)])).unwrap();
        worker.handle(diff(4, vec![(10, 9)])).unwrap();
        worker.handle(diff(2, vec![(11, 1)])).unwrap();

        assert_eq!(book.snapshot().bids, vec![(10, 1)]);
        assert_eq!(worker.window().len(), 1);
    }

    #[tokio::test]
    async fn test_trade_on_inbound_queue_is_an_error() {
        let book = BookHandle::new(OrderBook::new("TEST"));
        let (mut worker, _tx) = worker(&book);

        let trade = BookMessage::Trade(TradeUpdate {
            instrument: "TEST".to_string(),
            timestamp: 0,
            price: 1,
            size: 1,
            side: TradeSide::Buy,
        });
        assert!(matches!(
            worker.handle(trade),
            Err(Error::UnexpectedMessage { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_exits_when_queue_closes() {
        let book = BookHandle::new(OrderBook::new("TEST"));
        let (worker, tx) = worker(&book);
        let handle = tokio::spawn(worker.run());

        tx.send(diff(1, vec![(5, 5)])).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(book.snapshot().bids, vec![(5, 5)]);
    }
}
