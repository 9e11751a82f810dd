//! Integration tests for the slice synchronizer.
//!
//! Drives the merge end to end through its public API: feeds in, slices out,
//! under manual and real frontiers.

#![allow(clippy::unwrap_used)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use proptest::prelude::*;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use slice_engine::clock::ManualTimeProvider;
use slice_engine::error::StreamFault;
use slice_engine::market::{Bar, DataKind, DataPoint, Symbol, Tick, Timestamp, TradeBar};
use slice_engine::slice::Slice;
use slice_engine::sync::{
    ChannelFeed, DriverExit, IterFeed, JsonLinesFeed, SliceSynchronizer, SubscriptionId,
    SyncDriver, SyncEvent,
};

// =============================================================================
// Helpers
// =============================================================================

fn at(seconds: i64) -> Timestamp {
    Timestamp::from_unix_seconds(seconds)
}

/// One-second trade bar for `symbol` ending at `end_seconds`.
fn bar(symbol: &str, end_seconds: i64) -> DataPoint {
    TradeBar::new(
        Symbol::new(symbol),
        at(end_seconds - 1),
        Duration::seconds(1),
        Bar::flat(dec!(100)),
        dec!(1),
    )
    .into()
}

fn tick(symbol: &str, seconds: i64) -> DataPoint {
    Tick::trade(Symbol::new(symbol), at(seconds), dec!(1), dec!(1)).into()
}

fn bars(symbol: &str) -> SubscriptionId {
    SubscriptionId::new(symbol, DataKind::TradeBar)
}

fn unbounded() -> Arc<ManualTimeProvider> {
    Arc::new(ManualTimeProvider::new(Timestamp::MAX))
}

fn slice_times(slices: &[Slice]) -> Vec<i64> {
    slices.iter().map(|s| s.time().unix_seconds()).collect()
}

fn slice_symbols(slice: &Slice) -> Vec<String> {
    slice.symbols().map(ToString::to_string).collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn interleaves_two_streams_by_end_time() {
    let mut sync = SliceSynchronizer::builder()
        .time_provider(unbounded())
        .feed(bars("A"), IterFeed::from_vec(vec![bar("A", 10), bar("A", 20)]))
        .feed(bars("B"), IterFeed::from_vec(vec![bar("B", 15)]))
        .build();

    let slices: Vec<Slice> = sync.ready_slices().collect();

    assert_eq!(slice_times(&slices), vec![10, 15, 20]);
    assert_eq!(slice_symbols(&slices[0]), vec!["A"]);
    assert_eq!(slice_symbols(&slices[1]), vec!["B"]);
    assert_eq!(slice_symbols(&slices[2]), vec!["A"]);
    assert_eq!(sync.step(), None);
}

#[test]
fn simultaneous_items_share_one_slice() {
    let mut sync = SliceSynchronizer::builder()
        .time_provider(unbounded())
        .feed(bars("A"), IterFeed::from_vec(vec![bar("A", 10)]))
        .feed(bars("B"), IterFeed::from_vec(vec![bar("B", 10)]))
        .build();

    let slices: Vec<Slice> = sync.ready_slices().collect();

    assert_eq!(slices.len(), 1);
    assert_eq!(slice_symbols(&slices[0]), vec!["A", "B"]);
}

#[test]
fn stalled_stream_does_not_block_others() {
    let (sender, feed) = ChannelFeed::channel(8);
    sender.try_send(Ok(bar("B", 15))).unwrap();

    let mut sync = SliceSynchronizer::builder()
        .time_provider(unbounded())
        .feed(bars("A"), IterFeed::from_vec(vec![bar("A", 10), bar("A", 20), bar("A", 30)]))
        .feed(bars("B"), feed)
        .build();

    let slices: Vec<Slice> = sync.ready_slices().collect();
    assert_eq!(slice_times(&slices), vec![10, 15, 20, 30]);

    // Only the stalled stream remains.
    assert_eq!(
        sync.step(),
        Some(SyncEvent::Idle {
            frontier: Timestamp::MAX,
            next_due: None,
        })
    );

    sender.try_send(Ok(bar("B", 40))).unwrap();
    drop(sender);
    let slices: Vec<Slice> = sync.ready_slices().collect();
    assert_eq!(slice_times(&slices), vec![40]);
    assert!(sync.is_finished());
}

#[test]
fn frontier_holds_back_future_data() {
    let clock = Arc::new(ManualTimeProvider::new(at(12)));
    let mut sync = SliceSynchronizer::builder()
        .time_provider(clock.clone())
        .feed(bars("A"), IterFeed::from_vec(vec![bar("A", 10), bar("A", 20)]))
        .feed(bars("B"), IterFeed::from_vec(vec![bar("B", 15)]))
        .build();

    let slices: Vec<Slice> = sync.ready_slices().collect();
    assert_eq!(slice_times(&slices), vec![10]);

    clock.set(at(15));
    let slices: Vec<Slice> = sync.ready_slices().collect();
    assert_eq!(slice_times(&slices), vec![15]);

    clock.set(at(19));
    assert_eq!(
        sync.step(),
        Some(SyncEvent::Idle {
            frontier: at(19),
            next_due: Some(at(20)),
        })
    );

    clock.set(at(25));
    let slices: Vec<Slice> = sync.ready_slices().collect();
    assert_eq!(slice_times(&slices), vec![20]);
}

#[test]
fn faulting_stream_is_isolated() {
    let (sender, feed) = ChannelFeed::channel(8);
    sender.try_send(Ok(tick("A", 10))).unwrap();
    sender.try_send(Err(StreamFault::Io("connection reset".into()))).unwrap();

    let mut sync = SliceSynchronizer::builder()
        .time_provider(unbounded())
        .feed(SubscriptionId::new("A", DataKind::Tick), feed)
        .feed(bars("B"), IterFeed::from_vec(vec![bar("B", 10), bar("B", 20)]))
        .build();

    let mut events = Vec::new();
    while let Some(event) = sync.step() {
        events.push(event);
    }

    let faults: Vec<&SubscriptionId> = events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::StreamFaulted { subscription, .. } => Some(subscription),
            _ => None,
        })
        .collect();
    assert_eq!(faults, vec![&SubscriptionId::new("A", DataKind::Tick)]);

    let slices: Vec<Slice> = events.into_iter().filter_map(SyncEvent::into_slice).collect();
    assert_eq!(slice_times(&slices), vec![10, 20]);
    assert_eq!(slice_symbols(&slices[0]), vec!["A", "B"]);
    assert_eq!(slice_symbols(&slices[1]), vec!["B"]);
}

#[test]
fn out_of_order_stream_is_faulted() {
    let mut sync = SliceSynchronizer::builder()
        .time_provider(unbounded())
        .feed(bars("A"), IterFeed::from_vec(vec![bar("A", 20), bar("A", 10)]))
        .build();

    let first = sync.step().and_then(SyncEvent::into_slice).unwrap();
    assert_eq!(first.time(), at(20));

    match sync.step() {
        Some(SyncEvent::StreamFaulted {
            error: StreamFault::OutOfOrder { previous, received },
            ..
        }) => {
            assert_eq!(previous, at(20));
            assert_eq!(received, at(10));
        }
        other => panic!("expected out-of-order fault, got {other:?}"),
    }
    assert_eq!(sync.step(), None);
}

#[test]
fn late_subscription_data_shares_last_emitted_timestamp() {
    let clock = unbounded();
    let mut sync = SliceSynchronizer::new(clock);
    sync.subscribe(bars("A"), IterFeed::from_vec(vec![bar("A", 20), bar("A", 30)]));

    let first = sync.step().and_then(SyncEvent::into_slice).unwrap();
    assert_eq!(first.time(), at(20));

    // B joins holding data older than what was already emitted.
    sync.subscribe(bars("B"), IterFeed::from_vec(vec![bar("B", 5), bar("B", 25)]));
    let slices: Vec<Slice> = sync.ready_slices().collect();

    assert_eq!(slice_times(&slices), vec![20, 25, 30]);
    assert_eq!(slice_symbols(&slices[0]), vec!["B"]);
    let late = slices[0].bars().get(&Symbol::new("B")).unwrap();
    assert_eq!(late.end_time(), at(5));
    for slice in &slices {
        for item in slice.data_points() {
            assert!(item.end_time() <= slice.time());
        }
    }
}

// =============================================================================
// Async driver
// =============================================================================

fn json_lines(points: &[DataPoint]) -> JsonLinesFeed<Cursor<Vec<u8>>> {
    let mut text = String::new();
    for point in points {
        text.push_str(&serde_json::to_string(point).unwrap());
        text.push('\n');
    }
    JsonLinesFeed::new(Cursor::new(text.into_bytes()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn driver_replays_file_feeds_deterministically_under_real_clock() {
    for _ in 0..20 {
        let mut sync = SliceSynchronizer::builder().build();
        sync.subscribe(bars("A"), json_lines(&[bar("A", 10), bar("A", 20)]));
        sync.subscribe(bars("B"), json_lines(&[bar("B", 15)]));

        let driver = SyncDriver::new(sync, StdDuration::from_millis(1), CancellationToken::new());
        let (handle, mut events) = driver.spawn(1);

        let mut slices = Vec::new();
        while let Some(event) = events.recv().await {
            if let SyncEvent::Slice(slice) = event {
                slices.push(slice);
            }
        }

        assert_eq!(slice_times(&slices), vec![10, 15, 20]);
        assert_eq!(slice_symbols(&slices[1]), vec!["B"]);
        assert_eq!(handle.await.unwrap(), DriverExit::Finished);
    }
}

#[tokio::test]
async fn driver_streams_producer_data_under_real_clock() {
    let (sender, feed) = ChannelFeed::channel(4);
    let mut sync = SliceSynchronizer::builder().build();
    sync.subscribe(SubscriptionId::new("SPY", DataKind::Tick), feed);

    let producer = tokio::spawn(async move {
        for seconds in [100, 200, 300] {
            sender.send(Ok(tick("SPY", seconds))).await.unwrap();
        }
    });

    let driver = SyncDriver::new(sync, StdDuration::from_millis(1), CancellationToken::new());
    let (handle, mut events) = driver.spawn(16);

    let mut times = Vec::new();
    while let Some(event) = events.recv().await {
        if let SyncEvent::Slice(slice) = event {
            times.push(slice.time().unix_seconds());
        }
    }

    producer.await.unwrap();
    assert_eq!(times, vec![100, 200, 300]);
    assert_eq!(handle.await.unwrap(), DriverExit::Finished);
}

#[tokio::test]
async fn driver_cancellation_stops_emission() {
    let (sender, feed) = ChannelFeed::channel(4);
    let mut sync = SliceSynchronizer::builder().time_provider(unbounded()).build();
    sync.subscribe(SubscriptionId::new("SPY", DataKind::Tick), feed);

    let cancel = CancellationToken::new();
    let driver = SyncDriver::new(sync, StdDuration::from_millis(5), cancel.clone());
    let (handle, mut events) = driver.spawn(4);

    sender.send(Ok(tick("SPY", 1))).await.unwrap();
    let first = events.recv().await.and_then(SyncEvent::into_slice).unwrap();
    assert_eq!(first.time(), at(1));

    cancel.cancel();
    assert_eq!(handle.await.unwrap(), DriverExit::Cancelled);
    assert!(events.recv().await.is_none());
}

// =============================================================================
// Properties
// =============================================================================

/// Sorted tick times (seconds) for up to four streams.
fn stream_times() -> impl Strategy<Value = Vec<Vec<i64>>> {
    prop::collection::vec(
        prop::collection::vec(0i64..100, 0..15).prop_map(|mut times| {
            times.sort_unstable();
            times
        }),
        1..5,
    )
}

proptest! {
    #[test]
    fn slices_are_ordered_and_never_look_ahead(
        streams in stream_times(),
        advances in prop::collection::vec(1i64..25, 1..20),
    ) {
        let clock = Arc::new(ManualTimeProvider::new(at(0)));
        let mut sync = SliceSynchronizer::new(clock.clone());
        let expected: usize = streams.iter().map(Vec::len).sum();

        for (index, times) in streams.iter().enumerate() {
            let symbol = format!("S{index}");
            let points = times.iter().map(|t| tick(&symbol, *t)).collect();
            sync.subscribe(
                SubscriptionId::new(symbol.as_str(), DataKind::Tick),
                IterFeed::from_vec(points),
            );
        }

        let mut emitted = 0;
        let mut last_time = None;
        let mut advance = advances.iter().cycle();

        for _ in 0..1_000 {
            if sync.is_finished() {
                break;
            }
            let frontier = clock.now_after(*advance.next().unwrap());

            while let Some(event) = sync.step() {
                match event {
                    SyncEvent::Slice(slice) => {
                        prop_assert!(slice.time() <= frontier);
                        if let Some(last) = last_time {
                            prop_assert!(slice.time() >= last);
                        }
                        for item in slice.data_points() {
                            prop_assert!(item.end_time() <= slice.time());
                        }
                        last_time = Some(slice.time());
                        emitted += slice.data_count();
                    }
                    SyncEvent::Idle { .. } => break,
                    SyncEvent::StreamFaulted { error, .. } => {
                        prop_assert!(false, "unexpected fault: {}", error);
                    }
                }
            }
        }

        prop_assert!(sync.is_finished());
        prop_assert_eq!(emitted, expected);
    }
}

/// Advance a manual clock and return the new instant.
trait AdvanceExt {
    fn now_after(&self, seconds: i64) -> Timestamp;
}

impl AdvanceExt for ManualTimeProvider {
    fn now_after(&self, seconds: i64) -> Timestamp {
        use slice_engine::clock::TimeProvider;

        self.advance(Duration::seconds(seconds));
        self.now()
    }
}
