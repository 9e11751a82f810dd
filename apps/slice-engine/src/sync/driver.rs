//! Async driving loop pushing synchronizer events into a bounded channel.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::events::SyncEvent;
use super::synchronizer::SliceSynchronizer;

/// Why a [`SyncDriver`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// Every stream ended.
    Finished,
    /// The cancellation token fired.
    Cancelled,
    /// The event receiver was dropped.
    ReceiverClosed,
}

/// Owns a [`SliceSynchronizer`] and steps it on a tokio task.
///
/// Slices and fault events are sent in order; idle steps are not forwarded,
/// the driver sleeps `idle_poll_interval` instead. Cancellation is checked
/// between steps and while waiting for channel capacity; an event still
/// waiting for capacity when the token fires is dropped.
#[derive(Debug)]
pub struct SyncDriver {
    synchronizer: SliceSynchronizer,
    idle_poll_interval: Duration,
    cancel: CancellationToken,
}

impl SyncDriver {
    /// Create a driver.
    pub const fn new(
        synchronizer: SliceSynchronizer,
        idle_poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            synchronizer,
            idle_poll_interval,
            cancel,
        }
    }

    /// Spawn the loop on the current runtime.
    ///
    /// Returns the task handle and the receiving end of a channel holding at
    /// most `capacity` undelivered events.
    pub fn spawn(self, capacity: usize) -> (JoinHandle<DriverExit>, mpsc::Receiver<SyncEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let handle = tokio::spawn(self.run(sender));
        (handle, receiver)
    }

    /// Drive the synchronizer until it finishes, is cancelled, or loses its receiver.
    pub async fn run(mut self, events: mpsc::Sender<SyncEvent>) -> DriverExit {
        info!(
            subscriptions = self.synchronizer.active_subscriptions(),
            idle_poll_ms = self.idle_poll_interval.as_millis() as u64,
            "Sync driver started"
        );

        let exit = loop {
            if self.cancel.is_cancelled() {
                break DriverExit::Cancelled;
            }

            match self.synchronizer.step() {
                None => break DriverExit::Finished,
                Some(SyncEvent::Idle { frontier, next_due }) => {
                    debug!(frontier = %frontier, next_due = ?next_due, "Nothing due; waiting");
                    tokio::select! {
                        () = self.cancel.cancelled() => break DriverExit::Cancelled,
                        () = tokio::time::sleep(self.idle_poll_interval) => {}
                    }
                }
                Some(event) => {
                    tokio::select! {
                        () = self.cancel.cancelled() => break DriverExit::Cancelled,
                        sent = events.send(event) => {
                            if sent.is_err() {
                                break DriverExit::ReceiverClosed;
                            }
                        }
                    }
                }
            }
        };

        info!(
            exit = ?exit,
            slices = self.synchronizer.slices_emitted(),
            "Sync driver stopped"
        );
        exit
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::clock::ManualTimeProvider;
    use crate::market::{Bar, DataKind, DataPoint, Symbol, Timestamp, TradeBar};
    use crate::sync::{ChannelFeed, IterFeed, SubscriptionId};

    fn bars(symbol: &str, ends: &[i64]) -> IterFeed<std::vec::IntoIter<DataPoint>> {
        IterFeed::from_vec(
            ends.iter()
                .map(|end| {
                    TradeBar::new(
                        Symbol::new(symbol),
                        Timestamp::from_unix_seconds(end - 1),
                        ChronoDuration::seconds(1),
                        Bar::flat(dec!(1)),
                        dec!(1),
                    )
                    .into()
                })
                .collect(),
        )
    }

    fn synchronizer() -> SliceSynchronizer {
        SliceSynchronizer::new(Arc::new(ManualTimeProvider::new(Timestamp::MAX)))
    }

    #[tokio::test]
    async fn driver_sends_slices_then_finishes() {
        let mut sync = synchronizer();
        sync.subscribe(
            SubscriptionId::new("SPY", DataKind::TradeBar),
            bars("SPY", &[10, 20, 30]),
        );

        let driver = SyncDriver::new(sync, Duration::from_millis(1), CancellationToken::new());
        let (handle, mut events) = driver.spawn(8);

        let mut times = Vec::new();
        while let Some(event) = events.recv().await {
            if let SyncEvent::Slice(slice) = event {
                times.push(slice.time().unix_seconds());
            }
        }

        assert_eq!(times, vec![10, 20, 30]);
        assert_eq!(handle.await.unwrap(), DriverExit::Finished);
    }

    #[tokio::test]
    async fn driver_stops_on_cancel_while_idle() {
        let (_sender, feed) = ChannelFeed::channel(1);
        let mut sync = synchronizer();
        sync.subscribe(SubscriptionId::new("SPY", DataKind::Tick), feed);

        let cancel = CancellationToken::new();
        let driver = SyncDriver::new(sync, Duration::from_secs(60), cancel.clone());
        let (handle, _events) = driver.spawn(1);

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), DriverExit::Cancelled);
    }

    #[tokio::test]
    async fn driver_stops_on_cancel_while_channel_full() {
        let ends: Vec<i64> = (1..=99).map(|n| n * 10).collect();
        let mut sync = synchronizer();
        sync.subscribe(SubscriptionId::new("SPY", DataKind::TradeBar), bars("SPY", &ends));

        let cancel = CancellationToken::new();
        let driver = SyncDriver::new(sync, Duration::from_millis(1), cancel.clone());
        let (handle, _events) = driver.spawn(1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let exit = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("driver should stop once cancelled")
            .unwrap();
        assert_eq!(exit, DriverExit::Cancelled);
    }

    #[test]
    fn driver_stops_when_receiver_dropped() {
        let mut sync = synchronizer();
        sync.subscribe(
            SubscriptionId::new("SPY", DataKind::TradeBar),
            bars("SPY", &[10, 20, 30]),
        );

        let driver = SyncDriver::new(sync, Duration::from_millis(1), CancellationToken::new());
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);

        assert_eq!(tokio_test::block_on(driver.run(sender)), DriverExit::ReceiverClosed);
    }
}
