//! Frontier-bounded k-way merge of subscription streams into slices.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::events::SyncEvent;
use super::feed::DataFeed;
use super::subscription::{Subscription, SubscriptionId, SubscriptionStream};
use crate::clock::{FrontierClock, FrontierReader, RealTimeProvider, TimeProvider};
use crate::error::StreamFault;
use crate::market::{DataPoint, Timestamp};
use crate::observability::{
    record_slice_emitted, record_stream_exhausted, record_stream_fault, set_active_subscriptions,
};
use crate::slice::Slice;

/// Merges subscription streams into time slices.
///
/// Each [`step`](Self::step) advances the frontier, finds the earliest pending
/// end time across the streams and, if it is not beyond the frontier, drains
/// every stream due at that instant into one [`Slice`]. Slices are stamped
/// with a non-decreasing time and never hold data that ends after it.
pub struct SliceSynchronizer {
    streams: Vec<Box<dyn SubscriptionStream>>,
    clock: FrontierClock,
    last_emitted: Option<Timestamp>,
    pending_events: VecDeque<SyncEvent>,
    slices_emitted: u64,
}

impl std::fmt::Debug for SliceSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceSynchronizer")
            .field(
                "streams",
                &self.streams.iter().map(|s| s.id().to_string()).collect::<Vec<_>>(),
            )
            .field("clock", &self.clock)
            .field("last_emitted", &self.last_emitted)
            .field("pending_events", &self.pending_events.len())
            .field("slices_emitted", &self.slices_emitted)
            .finish()
    }
}

impl SliceSynchronizer {
    /// Create a synchronizer whose frontier follows `time_provider`.
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self::with_clock(FrontierClock::new(time_provider))
    }

    /// Create a synchronizer driving an existing frontier clock.
    pub fn with_clock(clock: FrontierClock) -> Self {
        info!(frontier = %clock.current(), "Slice synchronizer created");
        Self {
            streams: Vec::new(),
            clock,
            last_emitted: None,
            pending_events: VecDeque::new(),
            slices_emitted: 0,
        }
    }

    /// Start building a synchronizer.
    #[must_use]
    pub fn builder() -> SliceSynchronizerBuilder {
        SliceSynchronizerBuilder::new()
    }

    /// Add a stream. Returns `false`, dropping the stream, if its id is already active.
    pub fn add_subscription(&mut self, stream: Box<dyn SubscriptionStream>) -> bool {
        if self.streams.iter().any(|s| s.id() == stream.id()) {
            warn!(subscription = %stream.id(), "Subscription already active; ignoring");
            return false;
        }

        info!(subscription = %stream.id(), "Subscription added");
        self.streams.push(stream);
        set_active_subscriptions(self.streams.len());
        true
    }

    /// Add a stream reading `feed`.
    pub fn subscribe<F: DataFeed + 'static>(&mut self, id: SubscriptionId, feed: F) -> bool {
        self.add_subscription(Box::new(Subscription::new(id, feed)))
    }

    /// Remove the stream with `id`, discarding anything it has buffered.
    pub fn remove_subscription(&mut self, id: &SubscriptionId) -> bool {
        let before = self.streams.len();
        self.streams.retain(|s| s.id() != id);
        let removed = self.streams.len() != before;

        if removed {
            info!(subscription = %id, "Subscription removed");
            set_active_subscriptions(self.streams.len());
        }
        removed
    }

    /// Ids of the active streams.
    pub fn subscriptions(&self) -> impl Iterator<Item = &SubscriptionId> {
        self.streams.iter().map(|s| s.id())
    }

    /// Number of active streams.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.streams.len()
    }

    /// Read-only handle on the frontier.
    #[must_use]
    pub fn frontier(&self) -> FrontierReader {
        self.clock.frontier()
    }

    /// Time of the last emitted slice.
    #[must_use]
    pub const fn last_emitted(&self) -> Option<Timestamp> {
        self.last_emitted
    }

    /// Number of slices emitted so far.
    #[must_use]
    pub const fn slices_emitted(&self) -> u64 {
        self.slices_emitted
    }

    /// Whether no streams remain and no events are pending.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.streams.is_empty() && self.pending_events.is_empty()
    }

    /// Run one synchronization step.
    ///
    /// Returns `None` once every stream has ended and all events were handed out.
    pub fn step(&mut self) -> Option<SyncEvent> {
        if let Some(event) = self.pending_events.pop_front() {
            return Some(event);
        }
        if self.streams.is_empty() {
            return None;
        }

        let frontier = self.clock.now();
        let due_times = self.peek_streams();

        let Some(min_due) = due_times.iter().flatten().min().copied() else {
            if let Some(event) = self.pending_events.pop_front() {
                return Some(event);
            }
            if self.streams.is_empty() {
                info!(slices = self.slices_emitted, "All subscriptions finished");
                return None;
            }
            return Some(SyncEvent::Idle {
                frontier,
                next_due: None,
            });
        };

        if min_due > frontier {
            return self.pending_events.pop_front().or(Some(SyncEvent::Idle {
                frontier,
                next_due: Some(min_due),
            }));
        }

        let data = self.drain_streams(&due_times, min_due);
        self.remove_exhausted();

        if data.is_empty() {
            return self.pending_events.pop_front().or(Some(SyncEvent::Idle {
                frontier,
                next_due: None,
            }));
        }

        let time = self.last_emitted.map_or(min_due, |last| last.max(min_due));
        let late = time > min_due;
        if late {
            debug!(due = %min_due, time = %time, "Late data folded into last emitted instant");
        }

        let slice = Slice::new(time, data);
        self.last_emitted = Some(time);
        self.slices_emitted += 1;
        record_slice_emitted(slice.data_count(), late);
        debug!(
            time = %time,
            frontier = %frontier,
            symbols = slice.len(),
            data_points = slice.data_count(),
            "Slice emitted"
        );

        Some(SyncEvent::Slice(slice))
    }

    /// Pull slices until the next idle step or the end of all streams.
    ///
    /// Faults are logged and counted but not yielded.
    pub fn ready_slices(&mut self) -> ReadySlices<'_> {
        ReadySlices { synchronizer: self }
    }

    /// Peek every stream, removing faulted and exhausted ones.
    ///
    /// The result is aligned with `self.streams` after removal.
    fn peek_streams(&mut self) -> Vec<Option<Timestamp>> {
        let mut due_times = Vec::with_capacity(self.streams.len());
        let mut index = 0;

        while index < self.streams.len() {
            match self.streams[index].peek_next_due_time() {
                Ok(None) if self.streams[index].is_exhausted() => {
                    let stream = self.streams.remove(index);
                    Self::log_exhausted(stream.as_ref());
                }
                Ok(due) => {
                    due_times.push(due);
                    index += 1;
                }
                Err(error) => {
                    let stream = self.streams.remove(index);
                    self.report_fault(stream.id().clone(), error);
                }
            }
        }

        set_active_subscriptions(self.streams.len());
        due_times
    }

    fn drain_streams(
        &mut self,
        due_times: &[Option<Timestamp>],
        instant: Timestamp,
    ) -> Vec<DataPoint> {
        let mut data = Vec::new();
        let mut faulted = Vec::new();

        for (index, due) in due_times.iter().enumerate() {
            if *due != Some(instant) {
                continue;
            }
            match self.streams[index].drain_due(instant) {
                Ok(points) => data.extend(points),
                Err(error) => faulted.push((index, error)),
            }
        }

        for (index, error) in faulted.into_iter().rev() {
            let stream = self.streams.remove(index);
            self.report_fault(stream.id().clone(), error);
        }

        data
    }

    fn remove_exhausted(&mut self) {
        let before = self.streams.len();
        self.streams.retain(|stream| {
            if stream.is_exhausted() {
                Self::log_exhausted(stream.as_ref());
                false
            } else {
                true
            }
        });

        if self.streams.len() != before {
            set_active_subscriptions(self.streams.len());
        }
    }

    fn log_exhausted(stream: &dyn SubscriptionStream) {
        debug!(subscription = %stream.id(), "Subscription exhausted");
        record_stream_exhausted(stream.id().kind);
    }

    fn report_fault(&mut self, subscription: SubscriptionId, error: StreamFault) {
        warn!(subscription = %subscription, error = %error, "Subscription faulted; removing");
        record_stream_fault(subscription.kind, error.reason());
        self.pending_events.push_back(SyncEvent::StreamFaulted {
            subscription,
            error,
        });
    }
}

/// Iterator over slices that are ready now. See [`SliceSynchronizer::ready_slices`].
#[derive(Debug)]
pub struct ReadySlices<'a> {
    synchronizer: &'a mut SliceSynchronizer,
}

impl Iterator for ReadySlices<'_> {
    type Item = Slice;

    fn next(&mut self) -> Option<Slice> {
        loop {
            match self.synchronizer.step()? {
                SyncEvent::Slice(slice) => return Some(slice),
                SyncEvent::StreamFaulted { .. } => {}
                SyncEvent::Idle { .. } => return None,
            }
        }
    }
}

/// Builder for [`SliceSynchronizer`] with fluent API.
#[derive(Default)]
pub struct SliceSynchronizerBuilder {
    time_provider: Option<Arc<dyn TimeProvider>>,
    streams: Vec<Box<dyn SubscriptionStream>>,
}

impl std::fmt::Debug for SliceSynchronizerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceSynchronizerBuilder")
            .field(
                "time_provider",
                &self.time_provider.as_ref().map(|p| p.name()),
            )
            .field("streams", &self.streams.len())
            .finish()
    }
}

impl SliceSynchronizerBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time provider the frontier follows. Defaults to the system clock.
    #[must_use]
    pub fn time_provider(mut self, provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = Some(provider);
        self
    }

    /// Add a stream.
    #[must_use]
    pub fn subscription(mut self, stream: Box<dyn SubscriptionStream>) -> Self {
        self.streams.push(stream);
        self
    }

    /// Add a stream reading `feed`.
    #[must_use]
    pub fn feed<F: DataFeed + 'static>(self, id: SubscriptionId, feed: F) -> Self {
        self.subscription(Box::new(Subscription::new(id, feed)))
    }

    /// Build the synchronizer.
    #[must_use]
    pub fn build(self) -> SliceSynchronizer {
        let provider = self
            .time_provider
            .unwrap_or_else(|| Arc::new(RealTimeProvider::new()));
        let mut synchronizer = SliceSynchronizer::new(provider);
        for stream in self.streams {
            synchronizer.add_subscription(stream);
        }
        synchronizer
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::clock::ManualTimeProvider;
    use crate::market::{Bar, DataKind, Symbol, Tick, TradeBar};
    use crate::sync::{ChannelFeed, IterFeed};

    fn at(seconds: i64) -> Timestamp {
        Timestamp::from_unix_seconds(seconds)
    }

    /// One-second bar for `symbol` ending at `end_seconds`.
    fn bar(symbol: &str, end_seconds: i64) -> DataPoint {
        TradeBar::new(
            Symbol::new(symbol),
            at(end_seconds - 1),
            Duration::seconds(1),
            Bar::flat(dec!(100)),
            dec!(10),
        )
        .into()
    }

    fn tick(symbol: &str, seconds: i64) -> DataPoint {
        Tick::trade(Symbol::new(symbol), at(seconds), dec!(1), dec!(1)).into()
    }

    fn bars(symbol: &str) -> SubscriptionId {
        SubscriptionId::new(symbol, DataKind::TradeBar)
    }

    fn manual(start: i64) -> Arc<ManualTimeProvider> {
        Arc::new(ManualTimeProvider::new(at(start)))
    }

    #[test]
    fn idle_until_frontier_reaches_data() {
        let clock = manual(5);
        let mut sync = SliceSynchronizer::builder()
            .time_provider(clock.clone())
            .feed(bars("SPY"), IterFeed::from_vec(vec![bar("SPY", 10)]))
            .build();

        assert_eq!(
            sync.step(),
            Some(SyncEvent::Idle {
                frontier: at(5),
                next_due: Some(at(10)),
            })
        );

        clock.set(at(10));
        let slice = sync.step().and_then(SyncEvent::into_slice).unwrap();
        assert_eq!(slice.time(), at(10));
        assert_eq!(sync.step(), None);
        assert!(sync.is_finished());
    }

    #[test]
    fn stalled_stream_reports_idle_without_next_due() {
        let (_sender, feed) = ChannelFeed::channel(4);
        let mut sync = SliceSynchronizer::new(manual(100));
        sync.subscribe(bars("SPY"), feed);

        assert_eq!(
            sync.step(),
            Some(SyncEvent::Idle {
                frontier: at(100),
                next_due: None,
            })
        );
        assert_eq!(sync.active_subscriptions(), 1);
    }

    #[test]
    fn faulted_stream_is_removed_and_reported() {
        let (sender, feed) = ChannelFeed::channel(4);
        sender
            .try_send(Err(StreamFault::Source("socket closed".into())))
            .unwrap();

        let mut sync = SliceSynchronizer::new(manual(100));
        sync.subscribe(bars("QQQ"), feed);
        sync.subscribe(bars("SPY"), IterFeed::from_vec(vec![bar("SPY", 10)]));

        let slice = sync.step().and_then(SyncEvent::into_slice).unwrap();
        assert!(slice.contains_symbol(&Symbol::new("SPY")));

        match sync.step() {
            Some(SyncEvent::StreamFaulted {
                subscription,
                error,
            }) => {
                assert_eq!(subscription, bars("QQQ"));
                assert_eq!(error, StreamFault::Source("socket closed".into()));
            }
            other => panic!("expected fault event, got {other:?}"),
        }
        assert_eq!(sync.step(), None);
    }

    #[test]
    fn late_stream_folds_into_last_emitted_instant() {
        let mut sync = SliceSynchronizer::new(manual(100));
        sync.subscribe(bars("SPY"), IterFeed::from_vec(vec![bar("SPY", 20)]));

        let first = sync.step().and_then(SyncEvent::into_slice).unwrap();
        assert_eq!(first.time(), at(20));

        sync.subscribe(bars("QQQ"), IterFeed::from_vec(vec![bar("QQQ", 15)]));
        let late = sync.step().and_then(SyncEvent::into_slice).unwrap();
        assert_eq!(late.time(), at(20));
        assert!(late.contains_symbol(&Symbol::new("QQQ")));
    }

    #[test]
    fn ticks_sharing_an_instant_land_in_one_slice() {
        let mut sync = SliceSynchronizer::new(manual(100));
        sync.subscribe(
            SubscriptionId::new("SPY", DataKind::Tick),
            IterFeed::from_vec(vec![tick("SPY", 10), tick("SPY", 10), tick("SPY", 11)]),
        );

        let slices: Vec<Slice> = sync.ready_slices().collect();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].ticks_for(&Symbol::new("SPY")).len(), 2);
        assert_eq!(slices[1].ticks_for(&Symbol::new("SPY")).len(), 1);
    }

    #[test]
    fn duplicate_subscription_is_rejected() {
        let mut sync = SliceSynchronizer::new(manual(0));
        assert!(sync.subscribe(bars("SPY"), IterFeed::from_vec(vec![])));
        assert!(!sync.subscribe(bars("SPY"), IterFeed::from_vec(vec![])));
        assert_eq!(sync.active_subscriptions(), 1);
    }

    #[test]
    fn removed_subscription_stops_contributing() {
        let mut sync = SliceSynchronizer::new(manual(100));
        sync.subscribe(bars("SPY"), IterFeed::from_vec(vec![bar("SPY", 10)]));
        sync.subscribe(bars("QQQ"), IterFeed::from_vec(vec![bar("QQQ", 10)]));

        assert!(sync.remove_subscription(&bars("QQQ")));
        assert!(!sync.remove_subscription(&bars("QQQ")));

        let slice = sync.step().and_then(SyncEvent::into_slice).unwrap();
        assert_eq!(slice.symbols().collect::<Vec<_>>(), vec![&Symbol::new("SPY")]);
    }

    #[test]
    fn frontier_reader_tracks_steps() {
        let clock = manual(5);
        let mut sync = SliceSynchronizer::new(clock.clone());
        sync.subscribe(bars("SPY"), IterFeed::from_vec(vec![bar("SPY", 10)]));
        let frontier = sync.frontier();

        clock.set(at(7));
        assert_eq!(frontier.now(), at(5));
        sync.step();
        assert_eq!(frontier.now(), at(7));
    }
}
