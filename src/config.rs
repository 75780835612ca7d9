//! Tracker configuration.
//!
//! This module provides [`TrackerConfig`], the knobs for window sizes, task
//! cadences and queue bounds. Defaults match production behaviour.

use std::time::Duration;

use crate::error::Error;

/// Default number of diffs kept per instrument for snapshot reconciliation
pub const DEFAULT_DIFF_WINDOW_SIZE: usize = 32;

/// Default bound of each per-instrument inbound queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configuration for the order book tracker
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use orderbook_tracker::TrackerConfig;
///
/// let config = TrackerConfig::default()
///     .with_refresh_interval(Duration::from_secs(600))
///     .with_queue_capacity(4096);
///
/// assert_eq!(config.diff_window_size(), 32);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Diffs retained per instrument for replay over a new snapshot
    diff_window_size: usize,

    /// Interval between tracking set refreshes
    refresh_interval: Duration,

    /// Pause after a transient task failure
    retry_delay: Duration,

    /// Minimum interval between periodic counter reports
    stats_interval: Duration,

    /// Bound of each per-instrument inbound queue
    queue_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            diff_window_size: DEFAULT_DIFF_WINDOW_SIZE,
            refresh_interval: Duration::from_secs(3600),
            retry_delay: Duration::from_secs(5),
            stats_interval: Duration::from_secs(60),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl TrackerConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reconciliation window size
    #[must_use]
    pub fn with_diff_window_size(mut self, size: usize) -> Self {
        self.diff_window_size = size;
        self
    }

    /// Set the tracking set refresh interval
    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the pause applied after a transient failure
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the periodic counter reporting interval
    #[must_use]
    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Set the per-instrument inbound queue bound
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Get the reconciliation window size
    pub fn diff_window_size(&self) -> usize {
        self.diff_window_size
    }

    /// Get the refresh interval
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Get the retry delay
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Get the stats interval
    pub fn stats_interval(&self) -> Duration {
        self.stats_interval
    }

    /// Get the inbound queue capacity
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Check that the configuration can drive a tracker
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the window or the queue bound is zero.
    pub fn validate(&self) -> Result<(), Error> {
        if self.diff_window_size == 0 {
            return Err(Error::Config("diff_window_size must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".into()));
        }
        Ok(())
    }
}
