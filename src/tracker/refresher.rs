//! Tracking set refresher: converges the tracked instruments on the directory.

use std::sync::Arc;

use tracing::info;

use crate::error::Error;

use super::data_source::TrackingDataSource;
use super::recover;
use super::state::TrackerState;

/// Instruments added and removed by one refresh cycle, sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Instruments that got a new worker
    pub added: Vec<String>,
    /// Instruments whose worker was cancelled and state dropped
    pub removed: Vec<String>,
}

impl RefreshOutcome {
    /// Check if the cycle changed nothing
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub(crate) struct Refresher {
    state: Arc<TrackerState>,
    data_source: Arc<dyn TrackingDataSource>,
}

impl Refresher {
    pub(crate) fn new(state: Arc<TrackerState>, data_source: Arc<dyn TrackingDataSource>) -> Self {
        Self { state, data_source }
    }

    /// Refresh now, then every `refresh_interval`; retry sooner on failure.
    pub(crate) async fn run(self) {
        loop {
            match refresh_tracking(&self.state, self.data_source.as_ref()).await {
                Ok(_) => tokio::time::sleep(self.state.config().refresh_interval()).await,
                Err(err) => {
                    recover("tracking refresher", &err, self.state.config().retry_delay()).await
                }
            }
        }
    }
}

/// Run one refresh cycle.
///
/// An instrument counts as tracked only while its worker is alive, so a
/// worker that terminated is restarted with the directory's fresh book.
/// Concurrent cycles queue up behind each other, and each one reads the
/// tracked set only after the previous cycle has registered its books.
pub(crate) async fn refresh_tracking(
    state: &TrackerState,
    data_source: &dyn TrackingDataSource,
) -> Result<RefreshOutcome, Error> {
    let _cycle = state.lock_refresh().await;
    let tracking = state.tracked_instruments();
    let available = data_source.get_tracking_pairs().await?;

    let mut outcome = RefreshOutcome::default();

    let mut new_entries: Vec<_> = available
        .iter()
        .filter(|(instrument, _)| !tracking.contains(*instrument))
        .map(|(_, entry)| entry.clone())
        .collect();
    new_entries.sort_by(|a, b| a.instrument.cmp(&b.instrument));
    for entry in new_entries {
        outcome.added.push(entry.instrument.clone());
        state.start_tracking(entry);
    }

    let mut deleted: Vec<String> = state
        .instruments()
        .into_iter()
        .filter(|instrument| !available.contains_key(instrument))
        .collect();
    deleted.sort();
    for instrument in deleted {
        if state.stop_tracking(&instrument) {
            outcome.removed.push(instrument);
        }
    }

    if !outcome.is_empty() {
        info!(
            added = outcome.added.len(),
            removed = outcome.removed.len(),
            tracked = state.len(),
            "Refreshed order book tracking set"
        );
    }
    Ok(outcome)
}
