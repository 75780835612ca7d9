//! Message and value types shared by the tracker and the order books.
//!
//! - [`messages`] - Diff, snapshot and trade messages consumed from the global streams

pub mod messages;

pub use messages::{BookMessage, BookUpdate, MessageKind, TradeSide, TradeUpdate};

/// Price in integer ticks
///
/// Tick size is an upstream concern: clients scale exchange prices before
/// pushing messages, so the books only compare and store integers.
pub type Price = u64;

/// Size in integer lots. A level with size 0 does not exist.
pub type Quantity = u64;

/// Timestamp in milliseconds since Unix epoch
pub type TimestampMs = u64;

/// One price level as `(price, size)`
pub type Level = (Price, Quantity);
