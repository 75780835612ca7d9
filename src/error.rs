//! Error types for the orderbook-tracker crate.
//!
//! Only genuine failures are errors. Stale diffs and messages for untracked
//! instruments are routing outcomes, counted rather than raised.

use thiserror::Error;

use crate::types::MessageKind;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration (zero capacity, zero window, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stream delivered a message of the wrong kind
    #[error("Unexpected {kind} message on the {stream} stream")]
    UnexpectedMessage {
        /// Stream the message arrived on
        stream: &'static str,
        /// Kind of the offending message
        kind: MessageKind,
    },

    /// The inbound queue of an instrument has no live worker behind it
    #[error("Inbound queue closed for {0}")]
    QueueClosed(String),

    /// The instrument directory failed to produce the tracking set
    #[error("Data source error: {0}")]
    DataSource(String),

    /// `start()` was called on a tracker whose tasks already own the streams
    #[error("Tracker already started")]
    AlreadyStarted,

    /// The tracker was stopped and no longer mutates its books
    #[error("Tracker stopped")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_message_display() {
        let err = Error::UnexpectedMessage {
            stream: "diff",
            kind: MessageKind::Trade,
        };
        assert_eq!(err.to_string(), "Unexpected trade message on the diff stream");
    }

    #[test]
    fn test_queue_closed_display() {
        let err = Error::QueueClosed("BTC-USDT".to_string());
        assert!(err.to_string().contains("BTC-USDT"));
    }

    #[test]
    fn test_stopped_display() {
        assert_eq!(Error::Stopped.to_string(), "Tracker stopped");
    }
}
