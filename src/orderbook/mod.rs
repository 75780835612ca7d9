//! Per-instrument book state.
//!
//! - [`OrderBook`] - price levels, baseline update id and trade-derived state
//! - [`DiffWindow`] - bounded recent-diff history used to reconcile snapshots
//! - [`BookHandle`] - read-only shared view handed to consumers
//!
//! # Example
//!
//! ```rust
//! use orderbook_tracker::orderbook::OrderBook;
//! use orderbook_tracker::types::BookUpdate;
//!
//! let snapshot = BookUpdate::new("BTC-USDT", 10, 0)
//!     .with_bids(vec![(100, 5)])
//!     .with_asks(vec![(101, 5)]);
//! let mut book = OrderBook::from_snapshot(&snapshot);
//!
//! book.apply_diff(&[(100, 0), (99, 2)], &[], 11);
//! assert_eq!(book.best_bid(), Some((99, 2)));
//! assert_eq!(book.snapshot_uid(), 11);
//! ```

pub mod book;
pub mod window;

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use book::{BookSnapshot, OrderBook, TradeEvent};
pub use window::DiffWindow;

/// Shared, read-only handle to a tracked book.
///
/// Only the tracker's own tasks can take the write lock.
#[derive(Debug, Clone)]
pub struct BookHandle(Arc<RwLock<OrderBook>>);

impl BookHandle {
    pub(crate) fn new(book: OrderBook) -> Self {
        Self(Arc::new(RwLock::new(book)))
    }

    /// Lock the book for reading. Do not hold the guard across `.await`.
    pub fn read(&self) -> RwLockReadGuard<'_, OrderBook> {
        self.0.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, OrderBook> {
        self.0.write()
    }

    /// Copy both sides out without holding the lock
    pub fn snapshot(&self) -> BookSnapshot {
        self.0.read().snapshot()
    }

    /// Current baseline update id
    pub fn snapshot_uid(&self) -> u64 {
        self.0.read().snapshot_uid()
    }
}
