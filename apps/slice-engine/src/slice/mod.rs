//! Time slices: everything due at one instant, grouped by kind.

mod dictionary;
#[allow(clippy::module_inception)]
mod slice;

pub use dictionary::{DataDictionary, Ticks};
pub use slice::{Slice, SliceData, SliceItem};
