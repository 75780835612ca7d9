//! Order book stream messages.
//!
//! Upstream clients decode exchange payloads into [`BookMessage`] values and
//! push them onto one of the tracker's three global streams.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Level, Price, Quantity, TimestampMs};

/// Discriminant of a [`BookMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Incremental level update
    Diff,
    /// Full book baseline
    Snapshot,
    /// Executed trade
    Trade,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Diff => write!(f, "diff"),
            MessageKind::Snapshot => write!(f, "snapshot"),
            MessageKind::Trade => write!(f, "trade"),
        }
    }
}

/// A message on one of the global order book streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookMessage {
    /// Incremental update (diff stream)
    Diff(BookUpdate),
    /// Full state baseline (snapshot stream)
    Snapshot(BookUpdate),
    /// Trade print (trade stream)
    Trade(TradeUpdate),
}

impl BookMessage {
    /// Discriminant of this message
    pub fn kind(&self) -> MessageKind {
        match self {
            BookMessage::Diff(_) => MessageKind::Diff,
            BookMessage::Snapshot(_) => MessageKind::Snapshot,
            BookMessage::Trade(_) => MessageKind::Trade,
        }
    }

    /// Instrument this message belongs to
    pub fn instrument(&self) -> &str {
        match self {
            BookMessage::Diff(u) | BookMessage::Snapshot(u) => &u.instrument,
            BookMessage::Trade(t) => &t.instrument,
        }
    }

    /// Receipt or generation time
    pub fn timestamp(&self) -> TimestampMs {
        match self {
            BookMessage::Diff(u) | BookMessage::Snapshot(u) => u.timestamp,
            BookMessage::Trade(t) => t.timestamp,
        }
    }

    /// Update identifier; `None` for trades, which are not sequenced
    pub fn update_id(&self) -> Option<u64> {
        match self {
            BookMessage::Diff(u) | BookMessage::Snapshot(u) => Some(u.update_id),
            BookMessage::Trade(_) => None,
        }
    }
}

/// Level data carried by diffs and snapshots
///
/// Levels are absolute: a diff level replaces whatever size the book held at
/// that price, and a size of 0 removes the level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookUpdate {
    /// Instrument key (e.g. `"BTC-USDT"`)
    pub instrument: String,
    /// Monotonic update identifier assigned by the exchange
    pub update_id: u64,
    /// Timestamp (Unix ms)
    pub timestamp: TimestampMs,
    /// Bid levels: [[price, size], ...]
    #[serde(default)]
    pub bids: Vec<Level>,
    /// Ask levels: [[price, size], ...]
    #[serde(default)]
    pub asks: Vec<Level>,
}

impl BookUpdate {
    /// Create an update with no levels
    pub fn new(instrument: impl Into<String>, update_id: u64, timestamp: TimestampMs) -> Self {
        Self {
            instrument: instrument.into(),
            update_id,
            timestamp,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Set the bid levels
    #[must_use]
    pub fn with_bids(mut self, bids: Vec<Level>) -> Self {
        self.bids = bids;
        self
    }

    /// Set the ask levels
    #[must_use]
    pub fn with_asks(mut self, asks: Vec<Level>) -> Self {
        self.asks = asks;
        self
    }

    /// Wrap as a diff message
    pub fn into_diff(self) -> BookMessage {
        BookMessage::Diff(self)
    }

    /// Wrap as a snapshot message
    pub fn into_snapshot(self) -> BookMessage {
        BookMessage::Snapshot(self)
    }
}

/// Aggressor side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// Buyer lifted an ask
    Buy,
    /// Seller hit a bid
    Sell,
}

/// Trade print
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeUpdate {
    /// Instrument key
    pub instrument: String,
    /// Timestamp (Unix ms)
    pub timestamp: TimestampMs,
    /// Execution price in ticks
    pub price: Price,
    /// Executed size in lots
    pub size: Quantity,
    /// Aggressor side
    pub side: TradeSide,
}

impl From<TradeUpdate> for BookMessage {
    fn from(trade: TradeUpdate) -> Self {
        BookMessage::Trade(trade)
    }
}
