//! Simulated feed - drives the tracker with synthetic diffs, snapshots and trades
//!
//! Usage:
//!   cargo run --example simulated_feed
//!
//! Optional:
//!   RUST_LOG=orderbook_tracker=debug  # per-worker diff and snapshot logs

use std::sync::Arc;
use std::time::Duration;

use orderbook_tracker::orderbook::OrderBook;
use orderbook_tracker::tracker::{StaticDataSource, Tracker, TrackerEntry};
use orderbook_tracker::types::{BookUpdate, TradeSide, TradeUpdate};
use orderbook_tracker::TrackerConfig;

const INSTRUMENTS: [&str; 2] = ["BTC-USDT", "ETH-USDT"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("orderbook_tracker=info".parse()?),
        )
        .init();

    println!("=== Order Book Tracker Simulation ===\n");

    let source = Arc::new(StaticDataSource::with_entries(INSTRUMENTS.iter().map(
        |instrument| {
            let snapshot = BookUpdate::new(*instrument, 1000, 0)
                .with_bids(vec![(9_990, 10), (9_980, 20)])
                .with_asks(vec![(10_010, 10), (10_020, 20)]);
            TrackerEntry::new(OrderBook::from_snapshot(&snapshot), 0)
        },
    )));

    let config = TrackerConfig::default().with_stats_interval(Duration::from_secs(1));
    let mut tracker = Tracker::new(config, source)?;
    let diffs = tracker.diff_sender();
    let snapshots = tracker.snapshot_sender();
    let trades = tracker.trade_sender();
    let mut resyncs = tracker
        .take_resync_requests()
        .ok_or("resync requests already taken")?;

    tracker.start()?;
    while !tracker.ready() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    println!("Tracker ready: {} books\n", tracker.order_books().len());

    let producer = tokio::spawn(async move {
        for step in 1..=200u64 {
            let update_id = 1000 + step;
            for instrument in INSTRUMENTS {
                let level = 9_990 - (step % 5) * 10;
                let diff = BookUpdate::new(instrument, update_id, step)
                    .with_bids(vec![(level, step % 7)])
                    .with_asks(vec![(10_010 + (step % 3) * 10, 5 + step % 4)]);
                if diffs.send(diff.into_diff()).is_err() {
                    return;
                }

                if step % 10 == 0 {
                    let trade = TradeUpdate {
                        instrument: instrument.to_string(),
                        timestamp: step,
                        price: 10_010,
                        size: 1,
                        side: if step % 20 == 0 { TradeSide::Sell } else { TradeSide::Buy },
                    };
                    let _ = trades.send(trade.into());
                }

                // A slow snapshot fetched a few updates ago lands now
                if step % 50 == 0 {
                    let snapshot = BookUpdate::new(instrument, update_id - 3, step)
                        .with_bids(vec![(9_990, 10)])
                        .with_asks(vec![(10_010, 10)]);
                    let _ = snapshots.send(snapshot.into_snapshot());
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let resync_listener = tokio::spawn(async move {
        while let Some(instrument) = resyncs.recv().await {
            println!("Resync requested for {}", instrument);
        }
    });

    producer.await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    for (instrument, book) in tracker.order_books() {
        let book = book.read();
        println!("{} (update {})", instrument, book.snapshot_uid());
        println!("  best bid: {:?}", book.best_bid());
        println!("  best ask: {:?}", book.best_ask());
        println!("  spread:   {:?}", book.spread());
        println!(
            "  trades:   {} (volume {}, last {:?})",
            book.trade_count(),
            book.traded_volume(),
            book.last_trade().map(|t| t.side)
        );
    }
    println!("\n{:?}", tracker.stats());

    tracker.stop().await;
    resync_listener.abort();
    Ok(())
}
