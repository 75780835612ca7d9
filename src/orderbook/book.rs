//! Core order book data structure.
//!
//! This implementation uses `BTreeMap` for sorted price levels, providing:
//!
//! - O(log n) insertion, deletion, and lookup
//! - O(1) access to best bid/ask (via `first_key_value` / `last_key_value`)
//! - Ordered iteration for depth-of-book queries

use std::collections::BTreeMap;

use crate::types::{BookUpdate, Level, Price, Quantity, TimestampMs, TradeSide, TradeUpdate};

/// A trade applied to a book, built from a [`TradeUpdate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeEvent {
    /// Timestamp (Unix ms)
    pub timestamp: TimestampMs,
    /// Execution price
    pub price: Price,
    /// Executed size
    pub size: Quantity,
    /// Aggressor side, as received
    pub side: TradeSide,
}

impl From<&TradeUpdate> for TradeEvent {
    fn from(trade: &TradeUpdate) -> Self {
        Self {
            timestamp: trade.timestamp,
            price: trade.price,
            size: trade.size,
            side: trade.side,
        }
    }
}

/// Both sides of a book at a point in time, best level first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSnapshot {
    /// Bids, price descending
    pub bids: Vec<Level>,
    /// Asks, price ascending
    pub asks: Vec<Level>,
}

/// Order book for a single instrument.
///
/// # Design Decisions
///
/// 1. **Integer prices**: Prices and sizes are integer ticks and lots,
///    avoiding floating-point arithmetic and enabling exact comparisons.
///
/// 2. **Absolute levels**: Diffs carry the new size of a level, not a change.
///    A size of 0 removes the level.
///
/// 3. **Baseline tracking**: `snapshot_uid` records the update id of the last
///    snapshot or diff applied. Callers use it to reject stale diffs; the book
///    itself does not refuse regressions.
///
/// # Thread Safety
///
/// This struct is `Send + Sync` but not internally synchronized. The tracker
/// shares it as `Arc<parking_lot::RwLock<OrderBook>>`.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// Instrument key
    instrument: String,

    /// Bid levels: price -> size
    /// Sorted ascending by price (best bid = highest = last)
    bids: BTreeMap<Price, Quantity>,

    /// Ask levels: price -> size
    /// Sorted ascending by price (best ask = lowest = first)
    asks: BTreeMap<Price, Quantity>,

    /// Update id of the last applied baseline
    snapshot_uid: u64,

    last_trade: Option<TradeEvent>,
    trade_count: u64,
    traded_volume: Quantity,
}

impl OrderBook {
    /// Create a new empty order book for the given instrument
    #[must_use]
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            snapshot_uid: 0,
            last_trade: None,
            trade_count: 0,
            traded_volume: 0,
        }
    }

    /// Create a book from an initial snapshot (typically fetched over REST)
    #[must_use]
    pub fn from_snapshot(snapshot: &BookUpdate) -> Self {
        let mut book = Self::new(snapshot.instrument.clone());
        book.apply_snapshot(snapshot);
        book
    }

    /// Get the instrument key
    #[must_use]
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Get the update id of the current baseline
    #[must_use]
    pub const fn snapshot_uid(&self) -> u64 {
        self.snapshot_uid
    }

    /// Apply a diff.
    ///
    /// Each level replaces the size stored at its price; size 0 deletes it.
    /// Afterwards `snapshot_uid` equals `update_id`.
    pub fn apply_diff(&mut self, bids: &[Level], asks: &[Level], update_id: u64) {
        for &(price, size) in bids {
            set_level(&mut self.bids, price, size);
        }
        for &(price, size) in asks {
            set_level(&mut self.asks, price, size);
        }
        self.snapshot_uid = update_id;
    }

    /// Replace the book with `snapshot`, then replay newer buffered diffs.
    ///
    /// Diffs whose `update_id` is not greater than the snapshot's are
    /// skipped. The rest are applied in ascending `update_id` order,
    /// whatever order they are passed in.
    pub fn restore_from_snapshot<'a, I>(&mut self, snapshot: &BookUpdate, diffs: I)
    where
        I: IntoIterator<Item = &'a BookUpdate>,
    {
        self.apply_snapshot(snapshot);

        let mut replay: Vec<&BookUpdate> = diffs
            .into_iter()
            .filter(|diff| diff.update_id > snapshot.update_id)
            .collect();
        replay.sort_by_key(|diff| diff.update_id);

        for diff in replay {
            self.apply_diff(&diff.bids, &diff.asks, diff.update_id);
        }
    }

    fn apply_snapshot(&mut self, snapshot: &BookUpdate) {
        self.bids.clear();
        self.asks.clear();
        for &(price, size) in &snapshot.bids {
            set_level(&mut self.bids, price, size);
        }
        for &(price, size) in &snapshot.asks {
            set_level(&mut self.asks, price, size);
        }
        self.snapshot_uid = snapshot.update_id;
    }

    /// Record a trade. Levels are untouched; diffs carry the resulting depth.
    pub fn apply_trade(&mut self, trade: &TradeEvent) {
        self.last_trade = Some(*trade);
        self.trade_count += 1;
        self.traded_volume = self.traded_volume.saturating_add(trade.size);
    }

    /// Get the most recent trade
    #[must_use]
    pub fn last_trade(&self) -> Option<&TradeEvent> {
        self.last_trade.as_ref()
    }

    /// Get the number of trades applied
    #[must_use]
    pub const fn trade_count(&self) -> u64 {
        self.trade_count
    }

    /// Get the total size traded
    #[must_use]
    pub const fn traded_volume(&self) -> Quantity {
        self.traded_volume
    }

    /// Get the best bid (highest bid)
    ///
    /// Returns `(price, size)` or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<Level> {
        self.bids.last_key_value().map(|(&p, &q)| (p, q))
    }

    /// Get the best ask (lowest ask)
    ///
    /// Returns `(price, size)` or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<Level> {
        self.asks.first_key_value().map(|(&p, &q)| (p, q))
    }

    /// Get the mid price, or `None` if either side is empty
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid as f64 + ask as f64) / 2.0),
            _ => None,
        }
    }

    /// Get the spread in ticks
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    /// Get all bid levels, sorted by price descending (best first)
    pub fn bids(&self) -> impl Iterator<Item = Level> + '_ {
        self.bids.iter().rev().map(|(&p, &q)| (p, q))
    }

    /// Get all ask levels, sorted by price ascending (best first)
    pub fn asks(&self) -> impl Iterator<Item = Level> + '_ {
        self.asks.iter().map(|(&p, &q)| (p, q))
    }

    /// Get the top N bid levels
    #[must_use]
    pub fn top_bids(&self, n: usize) -> Vec<Level> {
        self.bids().take(n).collect()
    }

    /// Get the top N ask levels
    #[must_use]
    pub fn top_asks(&self, n: usize) -> Vec<Level> {
        self.asks().take(n).collect()
    }

    /// Copy both sides out, best level first
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            bids: self.bids().collect(),
            asks: self.asks().collect(),
        }
    }

    /// Check if the book has no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Get the number of price levels as `(bids, asks)`
    #[must_use]
    pub fn num_levels(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }
}

fn set_level(side: &mut BTreeMap<Price, Quantity>, price: Price, size: Quantity) {
    if size == 0 {
        side.remove(&price);
    } else {
        side.insert(price, size);
    }
}
