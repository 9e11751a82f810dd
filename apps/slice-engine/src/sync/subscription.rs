//! Subscription streams: one peek-buffered, time-ordered source per subscription.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::feed::{DataFeed, FeedPoll};
use crate::error::StreamFault;
use crate::market::{DataKind, DataPoint, Symbol, Timestamp};

/// Identity of a subscription: instrument, kind, and custom kind name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId {
    /// Instrument.
    pub symbol: Symbol,
    /// Data kind.
    pub kind: DataKind,
    /// Custom kind name, set only for [`DataKind::Custom`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_kind: Option<String>,
}

impl SubscriptionId {
    /// Subscription to a built-in kind.
    pub fn new(symbol: impl Into<Symbol>, kind: DataKind) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
            custom_kind: None,
        }
    }

    /// Subscription to a named custom kind.
    pub fn custom(symbol: impl Into<Symbol>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            kind: DataKind::Custom,
            custom_kind: Some(name.into()),
        }
    }
}

impl SubscriptionId {
    /// Subscription a data point belongs to.
    pub fn of(point: &DataPoint) -> Self {
        Self {
            symbol: point.symbol().clone(),
            kind: point.kind(),
            custom_kind: point.custom_kind().map(str::to_string),
        }
    }

    /// Whether `point` belongs to this subscription.
    pub fn matches(&self, point: &DataPoint) -> bool {
        point.symbol() == &self.symbol
            && point.kind() == self.kind
            && point.custom_kind() == self.custom_kind.as_deref()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.custom_kind {
            Some(name) => write!(f, "{}/custom:{name}", self.symbol),
            None => write!(f, "{}/{}", self.symbol, self.kind),
        }
    }
}

/// Time-ordered stream of data points consumed by the synchronizer.
///
/// Implementations keep at most one item ahead of the consumer.
pub trait SubscriptionStream: Send {
    /// Identity of the stream.
    fn id(&self) -> &SubscriptionId;

    /// End time of the next item, drawing one from the source if none is buffered.
    ///
    /// `Ok(None)` means nothing is available right now: the stream is stalled
    /// or, if [`is_exhausted`](Self::is_exhausted) holds, finished.
    ///
    /// # Errors
    ///
    /// Returns the [`StreamFault`] that ended the stream.
    fn peek_next_due_time(&mut self) -> Result<Option<Timestamp>, StreamFault>;

    /// Take every available item whose end time is at or before `instant`.
    ///
    /// # Errors
    ///
    /// Returns the [`StreamFault`] that ended the stream when no item was taken.
    fn drain_due(&mut self, instant: Timestamp) -> Result<Vec<DataPoint>, StreamFault>;

    /// Whether the stream has ended with nothing buffered.
    fn is_exhausted(&self) -> bool;
}

/// Adapts a [`DataFeed`] into a [`SubscriptionStream`].
///
/// Enforces per-stream order (end times never decrease) and routing (every
/// point matches the subscribed symbol, kind, and custom kind name). A fault met mid-drain is held back
/// until the items already taken have been handed over.
#[derive(Debug)]
pub struct Subscription<F> {
    id: SubscriptionId,
    feed: F,
    buffered: Option<DataPoint>,
    last_end_time: Option<Timestamp>,
    deferred_fault: Option<StreamFault>,
    finished: bool,
}

impl<F: DataFeed> Subscription<F> {
    /// Create a subscription reading `feed`.
    pub const fn new(id: SubscriptionId, feed: F) -> Self {
        Self {
            id,
            feed,
            buffered: None,
            last_end_time: None,
            deferred_fault: None,
            finished: false,
        }
    }

    /// End time of the last point accepted from the feed.
    #[must_use]
    pub const fn last_end_time(&self) -> Option<Timestamp> {
        self.last_end_time
    }

    fn accept(&mut self, point: DataPoint) -> Result<Timestamp, StreamFault> {
        if !self.id.matches(&point) {
            self.finished = true;
            return Err(StreamFault::Misrouted {
                expected: self.id.clone(),
                received: SubscriptionId::of(&point),
            });
        }

        let end_time = point.end_time();
        if let Some(previous) = self.last_end_time.filter(|previous| end_time < *previous) {
            self.finished = true;
            return Err(StreamFault::OutOfOrder {
                previous,
                received: end_time,
            });
        }

        self.last_end_time = Some(end_time);
        self.buffered = Some(point);
        Ok(end_time)
    }
}

impl<F: DataFeed> SubscriptionStream for Subscription<F> {
    fn id(&self) -> &SubscriptionId {
        &self.id
    }

    fn peek_next_due_time(&mut self) -> Result<Option<Timestamp>, StreamFault> {
        if let Some(point) = &self.buffered {
            return Ok(Some(point.end_time()));
        }
        if let Some(fault) = self.deferred_fault.take() {
            return Err(fault);
        }
        if self.finished {
            return Ok(None);
        }

        match self.feed.poll_next() {
            FeedPoll::Ready(point) => self.accept(point).map(Some),
            FeedPoll::Pending => Ok(None),
            FeedPoll::Finished => {
                self.finished = true;
                Ok(None)
            }
            FeedPoll::Faulted(fault) => {
                self.finished = true;
                Err(fault)
            }
        }
    }

    fn drain_due(&mut self, instant: Timestamp) -> Result<Vec<DataPoint>, StreamFault> {
        let mut due = Vec::new();

        loop {
            match self.peek_next_due_time() {
                Ok(Some(end_time)) if end_time <= instant => {
                    if let Some(point) = self.buffered.take() {
                        due.push(point);
                    }
                }
                Ok(_) => break,
                Err(fault) if due.is_empty() => return Err(fault),
                Err(fault) => {
                    self.deferred_fault = Some(fault);
                    break;
                }
            }
        }

        Ok(due)
    }

    fn is_exhausted(&self) -> bool {
        self.finished && self.buffered.is_none() && self.deferred_fault.is_none()
    }
}
