//! Timestamp value object for market data and clocks.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC instant on the engine's timeline.
///
/// Stored as `DateTime<Utc>`; the manual clock persists it at microsecond
/// resolution, so sub-microsecond detail is not preserved across a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Earliest representable instant.
    pub const MIN: Self = Self(DateTime::<Utc>::MIN_UTC);

    /// Latest representable instant. Used as an unbounded frontier.
    pub const MAX: Self = Self(DateTime::<Utc>::MAX_UTC);

    /// Create a new Timestamp from a DateTime<Utc>.
    #[must_use]
    pub const fn new(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the current wall-clock timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse from an ISO 8601 string.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not a valid ISO 8601 timestamp.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)?;
        Ok(Self(dt.with_timezone(&Utc)))
    }

    /// Build from Unix microseconds, saturating at the representable range.
    #[must_use]
    pub fn from_unix_micros(micros: i64) -> Self {
        DateTime::from_timestamp_micros(micros).map_or_else(
            || if micros < 0 { Self::MIN } else { Self::MAX },
            Self,
        )
    }

    /// Build from Unix seconds, saturating at the representable range.
    #[must_use]
    pub fn from_unix_seconds(seconds: i64) -> Self {
        DateTime::from_timestamp(seconds, 0).map_or_else(
            || if seconds < 0 { Self::MIN } else { Self::MAX },
            Self,
        )
    }

    /// Get the inner DateTime<Utc>.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Format as ISO 8601 / RFC 3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get the Unix timestamp in seconds.
    #[must_use]
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Get the Unix timestamp in microseconds.
    #[must_use]
    pub fn unix_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }

    /// Unix microseconds with the sentinels mapped to `i64::MIN` / `i64::MAX`.
    ///
    /// Inverse of [`Timestamp::from_unix_micros`] for every instant, including
    /// [`Timestamp::MIN`] and [`Timestamp::MAX`].
    #[must_use]
    pub fn to_unix_micros_saturating(&self) -> i64 {
        if *self == Self::MAX {
            i64::MAX
        } else if *self == Self::MIN {
            i64::MIN
        } else {
            self.unix_micros()
        }
    }

    /// Calculate duration since another timestamp.
    #[must_use]
    pub fn duration_since(&self, other: Self) -> Duration {
        self.0 - other.0
    }

    /// Add a duration, saturating at [`Timestamp::MAX`] / [`Timestamp::MIN`].
    #[must_use]
    pub fn saturating_add(&self, duration: Duration) -> Self {
        self.0.checked_add_signed(duration).map_or_else(
            || if duration < Duration::zero() { Self::MIN } else { Self::MAX },
            Self,
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
