//! User-defined data kinds (fundamentals, alternative data, signals).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Symbol, Timestamp};

/// A point of a custom data kind.
///
/// `kind` names the custom type (e.g. `"quandl"`); each distinct kind gets its
/// own container in a slice, so several custom kinds can share a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    /// Instrument the data refers to.
    pub symbol: Symbol,
    /// Custom type name.
    pub kind: String,
    /// Period start.
    pub time: Timestamp,
    /// Instant the data becomes visible.
    pub end_time: Timestamp,
    /// Primary value.
    pub value: Decimal,
    /// Extra columns carried through untouched.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl CustomData {
    /// Create a custom data point visible at `time`.
    #[must_use]
    pub fn new(symbol: Symbol, kind: impl Into<String>, time: Timestamp, value: Decimal) -> Self {
        Self {
            symbol,
            kind: kind.into(),
            time,
            end_time: time,
            value,
            fields: Map::new(),
        }
    }

    /// Set the visibility instant.
    #[must_use]
    pub const fn with_end_time(mut self, end_time: Timestamp) -> Self {
        self.end_time = end_time;
        self
    }

    /// Attach an extra column.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Look up an extra column.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
