//! Instrument directory consumed by the tracking set refresher.

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::Error;
use crate::orderbook::OrderBook;
use crate::types::TimestampMs;

/// An instrument the directory wants tracked, with its initial book
#[derive(Debug, Clone)]
pub struct TrackerEntry {
    /// Instrument key
    pub instrument: String,
    /// When the initial book was fetched (Unix ms)
    pub timestamp: TimestampMs,
    /// Freshly fetched book, used as the starting state
    pub order_book: OrderBook,
}

impl TrackerEntry {
    /// Create an entry; the instrument key is taken from the book
    pub fn new(order_book: OrderBook, timestamp: TimestampMs) -> Self {
        Self {
            instrument: order_book.instrument().to_string(),
            timestamp,
            order_book,
        }
    }
}

/// Source of the set of instruments to track.
///
/// Implementations typically wrap an exchange REST client: list the
/// instruments of interest and fetch an initial snapshot for each.
#[async_trait]
pub trait TrackingDataSource: Send + Sync {
    /// Instruments the directory wants tracked. Drives readiness.
    fn trading_pairs(&self) -> Vec<String>;

    /// Fetch the full tracking set, each with a fresh initial book
    async fn get_tracking_pairs(&self) -> Result<FxHashMap<String, TrackerEntry>, Error>;
}

/// In-memory directory whose contents can be replaced at runtime
#[derive(Debug, Default)]
pub struct StaticDataSource {
    entries: RwLock<FxHashMap<String, TrackerEntry>>,
}

impl StaticDataSource {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding `entries`
    pub fn with_entries(entries: impl IntoIterator<Item = TrackerEntry>) -> Self {
        let source = Self::new();
        source.set_entries(entries);
        source
    }

    /// Replace the whole tracking set
    pub fn set_entries(&self, entries: impl IntoIterator<Item = TrackerEntry>) {
        let map = entries
            .into_iter()
            .map(|entry| (entry.instrument.clone(), entry))
            .collect();
        *self.entries.write() = map;
    }

    /// Add or replace one instrument
    pub fn insert(&self, entry: TrackerEntry) {
        self.entries.write().insert(entry.instrument.clone(), entry);
    }

    /// Remove one instrument
    pub fn remove(&self, instrument: &str) -> Option<TrackerEntry> {
        self.entries.write().remove(instrument)
    }
}

#[async_trait]
impl TrackingDataSource for StaticDataSource {
    fn trading_pairs(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    async fn get_tracking_pairs(&self) -> Result<FxHashMap<String, TrackerEntry>, Error> {
        Ok(self.entries.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_replace() {
        let source = StaticDataSource::with_entries([
            TrackerEntry::new(OrderBook::new("A"), 0),
            TrackerEntry::new(OrderBook::new("B"), 0),
        ]);
        assert_eq!(source.trading_pairs().len(), 2);

        source.remove("A");
        source.insert(TrackerEntry::new(OrderBook::new("C"), 1));

        let pairs = source.get_tracking_pairs().await.unwrap();
        let mut keys: Vec<_> = pairs.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["B", "C"]);
        assert_eq!(pairs["C"].timestamp, 1);
    }
}
