//! Order book tracker: snapshot/diff reconciliation and routing.
//!
//! The [`Tracker`] owns three global streams (diff, snapshot, trade) and the
//! tasks that drain them:
//!
//! - **Diff router** - forwards diffs to the instrument's worker queue,
//!   rejecting stale diffs and unknown instruments
//! - **Snapshot router** - forwards snapshots to the worker queue
//! - **Book workers** - one per instrument; apply diffs, keep a bounded
//!   window of recent diffs, and replay it over each new snapshot
//! - **Trade emitter** - applies trades directly to the tracked books
//! - **Refresher** - converges the tracked set on the directory every
//!   `refresh_interval`
//!
//! # Failure handling
//!
//! Each task owns its errors. A failing message is logged, the task pauses
//! for `retry_delay` and then carries on with the next message. Cancellation
//! is `JoinHandle::abort`, which lands at the next `.await` (including the
//! retry pause) and is never seen by the error path.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use orderbook_tracker::orderbook::OrderBook;
//! use orderbook_tracker::tracker::{StaticDataSource, Tracker, TrackerEntry};
//! use orderbook_tracker::types::BookUpdate;
//! use orderbook_tracker::TrackerConfig;
//!
//! # async fn example() -> orderbook_tracker::Result<()> {
//! let source = Arc::new(StaticDataSource::with_entries([TrackerEntry::new(
//!     OrderBook::new("BTC-USDT"),
//!     0,
//! )]));
//! let mut tracker = Tracker::new(TrackerConfig::default(), source)?;
//! let diffs = tracker.diff_sender();
//! tracker.start()?;
//!
//! // Upstream client pushes decoded messages
//! let _ = diffs.send(BookUpdate::new("BTC-USDT", 1, 0).with_bids(vec![(100, 2)]).into_diff());
//!
//! if tracker.ready() {
//!     let books = tracker.snapshot();
//!     println!("{:?}", books.get("BTC-USDT"));
//! }
//! tracker.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod data_source;

mod refresher;
mod router;
mod state;
mod stats;
mod trades;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::orderbook::{BookHandle, BookSnapshot};
use crate::types::BookMessage;

pub use data_source::{StaticDataSource, TrackerEntry, TrackingDataSource};
pub use refresher::RefreshOutcome;
pub use stats::StatsSnapshot;

use refresher::Refresher;
use router::{DiffRouter, SnapshotRouter};
use state::TrackerState;
use trades::TradeEmitter;

/// Log a transient failure and pause before the task resumes its loop.
async fn recover(task: &'static str, err: &Error, delay: Duration) {
    error!(task, error = %err, "Unexpected error. Retrying after {:?}.", delay);
    tokio::time::sleep(delay).await;
}

/// Receiving halves of the global streams, handed to the tasks on start
#[derive(Debug)]
struct Streams {
    diff: mpsc::UnboundedReceiver<BookMessage>,
    snapshot: mpsc::UnboundedReceiver<BookMessage>,
    trade: mpsc::UnboundedReceiver<BookMessage>,
}

/// Keeps one consistent order book per tracked instrument.
///
/// Producers push [`BookMessage`]s through the senders returned by
/// [`diff_sender`](Self::diff_sender), [`snapshot_sender`](Self::snapshot_sender)
/// and [`trade_sender`](Self::trade_sender). Consumers read books through
/// [`order_books`](Self::order_books) and [`snapshot`](Self::snapshot).
pub struct Tracker {
    state: Arc<TrackerState>,
    data_source: Arc<dyn TrackingDataSource>,
    diff_tx: mpsc::UnboundedSender<BookMessage>,
    snapshot_tx: mpsc::UnboundedSender<BookMessage>,
    trade_tx: mpsc::UnboundedSender<BookMessage>,
    streams: Option<Streams>,
    resync_rx: Option<mpsc::UnboundedReceiver<String>>,
    /// Trade emitter, routers and refresher
    tasks: Vec<JoinHandle<()>>,
    stopped: bool,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("books", &self.state.len())
            .field("started", &self.streams.is_none())
            .field("tasks", &self.tasks.len())
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl Tracker {
    /// Create a tracker fed by `data_source`. No task runs until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: TrackerConfig, data_source: Arc<dyn TrackingDataSource>) -> Result<Self, Error> {
        config.validate()?;

        let (diff_tx, diff) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = mpsc::unbounded_channel();
        let (trade_tx, trade) = mpsc::unbounded_channel();
        let (resync_tx, resync_rx) = mpsc::unbounded_channel();

        Ok(Self {
            state: Arc::new(TrackerState::new(config, resync_tx)),
            data_source,
            diff_tx,
            snapshot_tx,
            trade_tx,
            streams: Some(Streams {
                diff,
                snapshot,
                trade,
            }),
            resync_rx: Some(resync_rx),
            tasks: Vec::new(),
            stopped: false,
        })
    }

    /// Launch the trade emitter, both routers and the refresher.
    ///
    /// The refresher runs its first cycle immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] if the streams were already handed
    /// to a previous start, and [`Error::Stopped`] after [`stop`](Self::stop).
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.stopped {
            return Err(Error::Stopped);
        }
        let streams = self.streams.take().ok_or(Error::AlreadyStarted)?;
        let state = &self.state;

        self.tasks.push(tokio::spawn(
            TradeEmitter::new(Arc::clone(state), streams.trade).run(),
        ));
        self.tasks.push(tokio::spawn(
            DiffRouter::new(Arc::clone(state), streams.diff).run(),
        ));
        self.tasks.push(tokio::spawn(
            SnapshotRouter::new(Arc::clone(state), streams.snapshot).run(),
        ));
        self.tasks.push(tokio::spawn(
            Refresher::new(Arc::clone(state), Arc::clone(&self.data_source)).run(),
        ));

        info!("Order book tracker started");
        Ok(())
    }

    /// Cancel every task, workers included, and wait for them to finish.
    ///
    /// No book is mutated after this returns. Books stay readable, and the
    /// tracker cannot be started or refreshed again. Calling it again is a
    /// no-op.
    pub async fn stop(&mut self) {
        self.stopped = true;
        // Tasks first, so the refresher cannot spawn workers we miss
        let tasks: Vec<_> = self.tasks.drain(..).collect();
        let had_tasks = !tasks.is_empty();
        cancel_all(tasks).await;
        cancel_all(self.state.take_workers()).await;

        if had_tasks {
            info!("Order book tracker stopped");
        }
    }

    /// Run one tracking set refresh now, outside the periodic schedule.
    ///
    /// Waits for a periodic cycle that is already running to finish first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] after [`stop`](Self::stop), otherwise
    /// propagates the data source's error.
    pub async fn refresh_tracking(&self) -> Result<RefreshOutcome, Error> {
        if self.stopped {
            return Err(Error::Stopped);
        }
        refresher::refresh_tracking(&self.state, self.data_source.as_ref()).await
    }

    /// Sender for the global diff stream
    pub fn diff_sender(&self) -> mpsc::UnboundedSender<BookMessage> {
        self.diff_tx.clone()
    }

    /// Sender for the global snapshot stream
    pub fn snapshot_sender(&self) -> mpsc::UnboundedSender<BookMessage> {
        self.snapshot_tx.clone()
    }

    /// Sender for the global trade stream
    pub fn trade_sender(&self) -> mpsc::UnboundedSender<BookMessage> {
        self.trade_tx.clone()
    }

    /// Take the stream of instruments that need a fresh snapshot.
    ///
    /// An instrument is published when its inbound queue overflows, once per
    /// gap: it is published again only after a snapshot has been applied.
    /// Returns `None` after the first call.
    pub fn take_resync_requests(&mut self) -> Option<mpsc::UnboundedReceiver<String>> {
        self.resync_rx.take()
    }

    /// All registered books by instrument
    pub fn order_books(&self) -> FxHashMap<String, BookHandle> {
        self.state.order_books()
    }

    /// One instrument's book
    pub fn book(&self, instrument: &str) -> Option<BookHandle> {
        self.state.book(instrument)
    }

    /// Instruments with a live worker
    pub fn tracked_instruments(&self) -> FxHashSet<String> {
        self.state.tracked_instruments()
    }

    /// True once at least one book exists and there are at least as many
    /// books as instruments the directory wants tracked.
    pub fn ready(&self) -> bool {
        let books = self.state.len();
        let desired = self.data_source.trading_pairs().len();
        books > 0 && desired <= books
    }

    /// Bids and asks of every registered book, best level first
    pub fn snapshot(&self) -> FxHashMap<String, BookSnapshot> {
        self.state
            .order_books()
            .into_iter()
            .map(|(instrument, book)| (instrument, book.snapshot()))
            .collect()
    }

    /// Lifetime message counters
    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats().snapshot()
    }

    /// Get the configuration
    pub fn config(&self) -> &TrackerConfig {
        self.state.config()
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        for worker in self.state.take_workers() {
            worker.abort();
        }
    }
}

async fn cancel_all(handles: Vec<JoinHandle<()>>) {
    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        // Cancelled (or already finished) tasks are expected here
        let _ = handle.await;
    }
}
