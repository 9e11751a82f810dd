//! Producer side of a subscription stream.
//!
//! A [`DataFeed`] is polled without blocking. [`Subscription`](super::Subscription)
//! wraps a feed with a one-item peek buffer and ordering checks.

use std::io::BufRead;

use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::error::StreamFault;
use crate::market::DataPoint;

/// Outcome of polling a feed once.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedPoll {
    /// Next data point, in end-time order.
    Ready(DataPoint),
    /// Nothing available yet; poll again later.
    Pending,
    /// The feed has ended.
    Finished,
    /// The feed failed and will produce nothing more.
    Faulted(StreamFault),
}

/// Non-blocking source of data points for one subscription.
pub trait DataFeed: Send {
    /// Poll for the next data point.
    fn poll_next(&mut self) -> FeedPoll;

    /// Feed name for logs.
    fn name(&self) -> &str {
        "DataFeed"
    }
}

// ============================================================================
// In-memory feed
// ============================================================================

/// Feed over an iterator; finishes when the iterator does.
#[derive(Debug)]
pub struct IterFeed<I> {
    items: I,
}

impl<I> IterFeed<I>
where
    I: Iterator<Item = DataPoint> + Send,
{
    /// Create a feed draining `items`.
    pub fn new(items: impl IntoIterator<Item = DataPoint, IntoIter = I>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl IterFeed<std::vec::IntoIter<DataPoint>> {
    /// Create a feed over an owned list of points.
    #[must_use]
    pub fn from_vec(items: Vec<DataPoint>) -> Self {
        Self::new(items)
    }
}

impl<I> DataFeed for IterFeed<I>
where
    I: Iterator<Item = DataPoint> + Send,
{
    fn poll_next(&mut self) -> FeedPoll {
        self.items.next().map_or(FeedPoll::Finished, FeedPoll::Ready)
    }

    fn name(&self) -> &str {
        "IterFeed"
    }
}

// ============================================================================
// Channel feed
// ============================================================================

/// Feed filled by a producer task or thread through a bounded channel.
///
/// An empty channel is [`FeedPoll::Pending`]. A closed channel is
/// [`FeedPoll::Finished`] for a finite feed and
/// [`StreamFault::Disconnected`] for a live one.
#[derive(Debug)]
pub struct ChannelFeed {
    receiver: mpsc::Receiver<Result<DataPoint, StreamFault>>,
    live: bool,
}

impl ChannelFeed {
    /// Create a bounded channel and the finite feed reading it.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<Result<DataPoint, StreamFault>>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self::new(receiver))
    }

    /// Finite feed over `receiver`; closing the channel ends the feed.
    #[must_use]
    pub const fn new(receiver: mpsc::Receiver<Result<DataPoint, StreamFault>>) -> Self {
        Self {
            receiver,
            live: false,
        }
    }

    /// Live feed over `receiver`; closing the channel is a fault.
    #[must_use]
    pub const fn live(receiver: mpsc::Receiver<Result<DataPoint, StreamFault>>) -> Self {
        Self {
            receiver,
            live: true,
        }
    }
}

impl DataFeed for ChannelFeed {
    fn poll_next(&mut self) -> FeedPoll {
        match self.receiver.try_recv() {
            Ok(Ok(point)) => FeedPoll::Ready(point),
            Ok(Err(fault)) => FeedPoll::Faulted(fault),
            Err(TryRecvError::Empty) => FeedPoll::Pending,
            Err(TryRecvError::Disconnected) if self.live => {
                FeedPoll::Faulted(StreamFault::Disconnected)
            }
            Err(TryRecvError::Disconnected) => FeedPoll::Finished,
        }
    }

    fn name(&self) -> &str {
        if self.live { "LiveChannelFeed" } else { "ChannelFeed" }
    }
}

// ============================================================================
// JSON-lines feed
// ============================================================================

/// Feed reading one JSON-encoded [`DataPoint`] per line.
///
/// Blank lines are skipped. A line that fails to parse faults the feed.
#[derive(Debug)]
pub struct JsonLinesFeed<R> {
    reader: R,
    line: String,
    line_number: usize,
    done: bool,
}

impl<R: BufRead + Send> JsonLinesFeed<R> {
    /// Create a feed over `reader`.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            done: false,
        }
    }
}

impl<R: BufRead + Send> DataFeed for JsonLinesFeed<R> {
    fn poll_next(&mut self) -> FeedPoll {
        if self.done {
            return FeedPoll::Finished;
        }

        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.done = true;
                    return FeedPoll::Finished;
                }
                Ok(_) => {
                    self.line_number += 1;
                    let trimmed = self.line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return match serde_json::from_str::<DataPoint>(trimmed) {
                        Ok(point) => FeedPoll::Ready(point),
                        Err(e) => {
                            self.done = true;
                            FeedPoll::Faulted(StreamFault::Source(format!(
                                "line {}: {e}",
                                self.line_number
                            )))
                        }
                    };
                }
                Err(e) => {
                    self.done = true;
                    return FeedPoll::Faulted(e.into());
                }
            }
        }
    }

    fn name(&self) -> &str {
        "JsonLinesFeed"
    }
}
