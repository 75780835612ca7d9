//! # orderbook-tracker
//!
//! Keeps one consistent order book per trading instrument by reconciling an
//! initial snapshot with live diff and trade streams that arrive out of band.
//!
//! ## Features
//!
//! - **Snapshot reconciliation** - diffs that arrive while a snapshot is in
//!   flight are buffered and replayed over it
//! - **Staleness rejection** - diffs that do not advance a book's baseline
//!   are dropped, never applied
//! - **Per-instrument workers** - strictly ordered application per
//!   instrument, with bounded queues and explicit overflow handling
//! - **Dynamic tracking set** - instruments are added and retired at runtime
//!   from an external directory
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use orderbook_tracker::orderbook::OrderBook;
//! use orderbook_tracker::tracker::{StaticDataSource, Tracker, TrackerEntry};
//! use orderbook_tracker::types::BookUpdate;
//! use orderbook_tracker::TrackerConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), orderbook_tracker::Error> {
//!     let initial = BookUpdate::new("BTC-USDT", 100, 0)
//!         .with_bids(vec![(6_500_000, 4)])
//!         .with_asks(vec![(6_500_100, 3)]);
//!     let source = Arc::new(StaticDataSource::with_entries([
//!         TrackerEntry::new(OrderBook::from_snapshot(&initial), 0),
//!     ]));
//!
//!     let mut tracker = Tracker::new(TrackerConfig::default(), source)?;
//!     let diffs = tracker.diff_sender();
//!     tracker.start()?;
//!
//!     let diff = BookUpdate::new("BTC-USDT", 101, 1).with_bids(vec![(6_500_000, 0)]);
//!     let _ = diffs.send(diff.into_diff());
//!
//!     tracker.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`tracker`] - the [`Tracker`] facade, routers, workers and refresher
//! - [`orderbook`] - per-instrument book state and the reconciliation window
//! - [`types`] - stream message types
//! - [`config`] - tracker configuration
//! - [`error`] - error types for the crate

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod orderbook;
pub mod tracker;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::TrackerConfig;
pub use error::Error;
pub use tracker::Tracker;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
