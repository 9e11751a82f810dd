//! History provider port, lazy slice sequence, and an in-memory adapter.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

use super::error::HistoryError;
use super::request::HistoryRequest;
use crate::clock::ManualTimeProvider;
use crate::market::{DataPoint, Timestamp};
use crate::slice::{Slice, SliceItem};
use crate::sync::{IterFeed, SliceSynchronizer, SubscriptionId};

/// Port for historical data.
pub trait HistoryProvider: Send + Sync {
    /// Slices covering every request, merged in time order.
    ///
    /// # Errors
    ///
    /// Returns an error if a request is invalid or cannot be served.
    fn get_history(
        &self,
        requests: &[HistoryRequest],
        time_zone: FixedOffset,
    ) -> Result<HistorySlices, HistoryError>;

    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

/// Lazy, time-ordered sequence of historical slices.
///
/// Backed by a synchronizer whose frontier is unbounded, so every slice is
/// ready as soon as its data is.
#[derive(Debug)]
pub struct HistorySlices {
    synchronizer: SliceSynchronizer,
    time_zone: FixedOffset,
}

impl HistorySlices {
    /// Wrap a synchronizer already holding the history streams.
    #[must_use]
    pub const fn new(synchronizer: SliceSynchronizer, time_zone: FixedOffset) -> Self {
        Self {
            synchronizer,
            time_zone,
        }
    }

    /// Empty sequence.
    #[must_use]
    pub fn empty(time_zone: FixedOffset) -> Self {
        Self::new(unbounded_synchronizer(), time_zone)
    }

    /// Time zone the requests were made in.
    #[must_use]
    pub const fn time_zone(&self) -> FixedOffset {
        self.time_zone
    }

    /// A slice time in the request time zone.
    #[must_use]
    pub fn local_time(&self, time: Timestamp) -> DateTime<FixedOffset> {
        time.as_datetime().with_timezone(&self.time_zone)
    }

    /// Hand every data point of every slice to `handler`. Returns the count.
    pub fn push_through<F>(self, handler: F) -> usize
    where
        F: FnMut(SliceItem<'_>),
    {
        push_through(self, handler)
    }
}

impl Iterator for HistorySlices {
    type Item = Slice;

    fn next(&mut self) -> Option<Slice> {
        self.synchronizer.ready_slices().next()
    }
}

/// Hand every data point of every slice to `handler`, in slice order.
///
/// Ticks are delivered one by one. Returns the number of points delivered.
pub fn push_through<I, F>(slices: I, mut handler: F) -> usize
where
    I: IntoIterator<Item = Slice>,
    F: FnMut(SliceItem<'_>),
{
    let mut delivered = 0;
    for slice in slices {
        for item in slice.data_points() {
            handler(item);
            delivered += 1;
        }
    }
    delivered
}

fn unbounded_synchronizer() -> SliceSynchronizer {
    SliceSynchronizer::new(Arc::new(ManualTimeProvider::new(Timestamp::MAX)))
}

/// In-memory history for testing and replay seeding.
#[derive(Debug, Default)]
pub struct InMemoryHistoryProvider {
    data: HashMap<SubscriptionId, Vec<DataPoint>>,
}

impl InMemoryHistoryProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add points for a subscription, keeping them sorted by end time.
    pub fn add_data(&mut self, id: SubscriptionId, points: impl IntoIterator<Item = DataPoint>) {
        let stored = self.data.entry(id).or_default();
        stored.extend(points);
        stored.sort_by_key(DataPoint::end_time);
    }
}

impl HistoryProvider for InMemoryHistoryProvider {
    fn get_history(
        &self,
        requests: &[HistoryRequest],
        time_zone: FixedOffset,
    ) -> Result<HistorySlices, HistoryError> {
        let mut grouped: Vec<(SubscriptionId, Vec<&HistoryRequest>)> = Vec::new();
        for request in requests {
            request.validate()?;
            let id = request.subscription_id();
            match grouped.iter_mut().find(|(existing, _)| *existing == id) {
                Some((_, ranges)) => ranges.push(request),
                None => grouped.push((id, vec![request])),
            }
        }

        let mut synchronizer = unbounded_synchronizer();
        for (id, ranges) in grouped {
            let stored = self
                .data
                .get(&id)
                .ok_or_else(|| HistoryError::NoData(id.to_string()))?;

            let points: Vec<DataPoint> = stored
                .iter()
                .filter(|point| ranges.iter().any(|r| r.covers(point.end_time())))
                .cloned()
                .collect();

            debug!(
                subscription = %id,
                ranges = ranges.len(),
                points = points.len(),
                "History request served"
            );
            synchronizer.subscribe(id, IterFeed::from_vec(points));
        }

        info!(
            source = self.name(),
            requests = requests.len(),
            time_zone = %time_zone,
            "History prepared"
        );
        Ok(HistorySlices::new(synchronizer, time_zone))
    }

    fn name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::market::{Bar, DataKind, Resolution, Symbol, Tick, TradeBar};

    fn at(seconds: i64) -> Timestamp {
        Timestamp::from_unix_seconds(seconds)
    }

    fn bar(symbol: &str, end_seconds: i64) -> DataPoint {
        TradeBar::new(
            Symbol::new(symbol),
            at(end_seconds - 60),
            Duration::minutes(1),
            Bar::flat(dec!(1.1)),
            dec!(0),
        )
        .into()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn provider() -> InMemoryHistoryProvider {
        let mut provider = InMemoryHistoryProvider::new();
        provider.add_data(
            SubscriptionId::new("EURUSD", DataKind::TradeBar),
            vec![bar("EURUSD", 180), bar("EURUSD", 60), bar("EURUSD", 120)],
        );
        provider.add_data(
            SubscriptionId::new("GBPUSD", DataKind::Tick),
            vec![
                Tick::trade(Symbol::new("GBPUSD"), at(120), dec!(1.3), dec!(1)).into(),
                Tick::trade(Symbol::new("GBPUSD"), at(120), dec!(1.31), dec!(1)).into(),
            ],
        );
        provider
    }

    #[test]
    fn history_merges_requests_in_time_order() {
        let requests = [
            HistoryRequest::new("EURUSD", DataKind::TradeBar, Resolution::Minute, at(60), at(180)),
            HistoryRequest::new("GBPUSD", DataKind::Tick, Resolution::Tick, at(0), at(180)),
        ];

        let slices: Vec<Slice> = provider().get_history(&requests, utc()).unwrap().collect();

        let times: Vec<i64> = slices.iter().map(|s| s.time().unix_seconds()).collect();
        assert_eq!(times, vec![60, 120, 180]);
        assert_eq!(slices[1].ticks_for(&Symbol::new("GBPUSD")).len(), 2);
        assert!(slices[1].contains_symbol(&Symbol::new("EURUSD")));
    }

    #[test]
    fn history_filters_to_request_range() {
        let requests = [HistoryRequest::new(
            "EURUSD",
            DataKind::TradeBar,
            Resolution::Minute,
            at(100),
            at(150),
        )];

        let slices: Vec<Slice> = provider().get_history(&requests, utc()).unwrap().collect();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].time(), at(120));
    }

    #[test]
    fn requests_for_one_subscription_serve_every_range() {
        let requests = [
            HistoryRequest::new("EURUSD", DataKind::TradeBar, Resolution::Minute, at(0), at(90)),
            HistoryRequest::new("EURUSD", DataKind::TradeBar, Resolution::Minute, at(150), at(200)),
        ];

        let times: Vec<i64> = provider()
            .get_history(&requests, utc())
            .unwrap()
            .map(|s| s.time().unix_seconds())
            .collect();

        assert_eq!(times, vec![60, 180]);
    }

    #[test]
    fn overlapping_ranges_deliver_each_point_once() {
        let requests = [
            HistoryRequest::new("EURUSD", DataKind::TradeBar, Resolution::Minute, at(0), at(130)),
            HistoryRequest::new("EURUSD", DataKind::TradeBar, Resolution::Minute, at(100), at(200)),
        ];

        let delivered = provider()
            .get_history(&requests, utc())
            .unwrap()
            .push_through(|_| {});

        assert_eq!(delivered, 3);
    }

    #[test]
    fn push_through_delivers_every_point() {
        let requests = [
            HistoryRequest::new("EURUSD", DataKind::TradeBar, Resolution::Minute, at(0), at(180)),
            HistoryRequest::new("GBPUSD", DataKind::Tick, Resolution::Tick, at(0), at(180)),
        ];

        let mut symbols = Vec::new();
        let delivered = provider()
            .get_history(&requests, utc())
            .unwrap()
            .push_through(|item| symbols.push(item.symbol().to_string()));

        assert_eq!(delivered, 5);
        assert_eq!(symbols.iter().filter(|s| *s == "GBPUSD").count(), 2);
    }

    #[test]
    fn unknown_subscription_is_no_data() {
        let requests = [HistoryRequest::new("SPY", DataKind::TradeBar, Resolution::Daily, at(0), at(1))];

        match provider().get_history(&requests, utc()) {
            Err(HistoryError::NoData(id)) => assert_eq!(id, "SPY/trade_bar"),
            other => panic!("expected NoData, got {other:?}"),
        }
    }

    #[test]
    fn local_time_uses_request_time_zone() {
        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
        let slices = HistorySlices::empty(new_york);

        assert_eq!(slices.local_time(at(0)).to_rfc3339(), "1969-12-31T19:00:00-05:00");
        assert_eq!(slices.count(), 0);
    }
}
