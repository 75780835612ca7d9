//! Trade emitter: applies trade prints straight to tracked books.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::Error;
use crate::orderbook::TradeEvent;
use crate::types::BookMessage;

use super::recover;
use super::state::TrackerState;
use super::stats::WindowCounters;

#[derive(Debug)]
pub(crate) struct TradeEmitter {
    state: Arc<TrackerState>,
    stream: mpsc::UnboundedReceiver<BookMessage>,
    counters: WindowCounters,
}

impl TradeEmitter {
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
            if let Err(err) = self.emit(message) {
                recover("trade emitter", &err, self.state.config().retry_delay()).await;
            }
        }
        info!("Trade stream closed");
    }

    fn emit(&mut self, message: BookMessage) -> Result<(), Error> {
        let kind = message.kind();
        let BookMessage::Trade(trade) = message else {
            return Err(Error::UnexpectedMessage {
                stream: "trade",
                kind,
            });
        };

        match self.state.book(&trade.instrument) {
            Some(book) => {
                book.write().apply_trade(&TradeEvent::from(&trade));
                self.counters.accept();
                self.state.stats().trade_accepted();
            }
            None => {
                self.counters.reject();
                self.state.stats().trade_rejected();
            }
        }

        if let Some((accepted, rejected)) = self.counters.take_report(Instant::now()) {
            debug!(accepted, rejected, "Trade messages processed");
        }
        Ok(())
    }
}
