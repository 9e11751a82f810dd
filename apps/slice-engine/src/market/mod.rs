//! Market data model.
//!
//! Value objects shared by every layer: instants, symbols, resolutions and the
//! closed set of data kinds a slice can hold.

mod bar;
mod custom;
mod data_point;
mod resolution;
mod symbol;
mod tick;
mod timestamp;

pub use bar::{Bar, QuoteBar, TradeBar};
pub use custom::CustomData;
pub use data_point::{DataKind, DataPoint};
pub use resolution::Resolution;
pub use symbol::Symbol;
pub use tick::{Tick, TickType};
pub use timestamp::Timestamp;
