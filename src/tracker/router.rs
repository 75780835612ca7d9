//! Routers fanning the global diff and snapshot streams out to workers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::info;

use crate::error::Error;
use crate::types::{BookMessage, MessageKind};

use super::recover;
use super::state::{Dispatch, TrackerState};
use super::stats::WindowCounters;

/// Forwards diffs to their instrument's queue, turning away stale ones.
#[derive(Debug)]
pub(crate) struct DiffRouter {
    state: Arc<TrackerState>,
    stream: mpsc::UnboundedReceiver<BookMessage>,
    counters: WindowCounters,
}

impl DiffRouter {
    pub(crate) fn new(state: Arc<TrackerState>, stream: mpsc::UnboundedReceiver<BookMessage>) -> Self {
        let counters = WindowCounters::new(state.config().stats_interval());
        Self {
            state,
            stream,
            counters,
        }
    }

    pub(crate) async fn run(mut self) {
        while let Some(message) = self.stream.recv().await {
            if let Err(err) = self.route(message) {
                recover("diff router", &err, self.state.config().retry_delay()).await;
            }
        }
        info!("Diff stream closed");
    }

    fn route(&mut self, message: BookMessage) -> Result<(), Error> {
        if message.kind() != MessageKind::Diff {
            return Err(Error::UnexpectedMessage {
                stream: "diff",
                kind: message.kind(),
            });
        }

        match self.state.dispatch(message, true)? {
            Dispatch::Accepted => {
                self.counters.accept();
                self.state.stats().diff_accepted();
            }
            Dispatch::Unknown | Dispatch::Stale | Dispatch::Overflow => {
                self.counters.reject();
                self.state.stats().diff_rejected();
            }
        }

        if let Some((accepted, rejected)) = self.counters.take_report(Instant::now()) {
            info!(accepted, rejected, "Diff messages processed");
        }
        Ok(())
    }
}

/// Forwards snapshots to their instrument's queue. No staleness check: a
/// snapshot is a deliberate resync and the worker reconciles it.
#[derive(Debug)]
pub(crate) struct SnapshotRouter {
    state: Arc<TrackerState>,
    stream: mpsc::UnboundedReceiver<BookMessage>,
}

impl SnapshotRouter {
    pub(crate) fn new(state: Arc<TrackerState>, stream: mpsc::UnboundedReceiver<BookMessage>) -> Self {
        Self { state, stream }
    }

    pub(crate) async fn run(mut self) {
        while let Some(message) = self.stream.recv().await {
            if let Err(err) = self.route(message) {
                recover("snapshot router", &err, self.state.config().retry_delay()).await;
            }
        }
        info!("Snapshot stream closed");
    }

    fn route(&mut self, message: BookMessage) -> Result<(), Error> {
        if message.kind() != MessageKind::Snapshot {
            return Err(Error::UnexpectedMessage {
                stream: "snapshot",
                kind: message.kind(),
            });
        }

        match self.state.dispatch(message, false)? {
            Dispatch::Accepted => self.state.stats().snapshot_routed(),
            Dispatch::Unknown => self.state.stats().snapshot_dropped(),
            // Overflow is counted by dispatch; Stale cannot happen unchecked
            Dispatch::Overflow | Dispatch::Stale => {}
        }
        Ok(())
    }
}
