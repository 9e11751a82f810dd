//! Synchronization of subscription streams into time slices.
//!
//! Producers implement [`DataFeed`]; [`Subscription`] adapts a feed into a
//! peek-buffered [`SubscriptionStream`]; [`SliceSynchronizer`] merges the
//! streams under the frontier; [`SyncDriver`] runs the merge on a tokio task.

mod driver;
mod events;
mod feed;
mod subscription;
mod synchronizer;

pub use driver::{DriverExit, SyncDriver};
pub use events::SyncEvent;
pub use feed::{ChannelFeed, DataFeed, FeedPoll, IterFeed, JsonLinesFeed};
pub use subscription::{Subscription, SubscriptionId, SubscriptionStream};
pub use synchronizer::{ReadySlices, SliceSynchronizer, SliceSynchronizerBuilder};
