//! Data resolution (bar period) for subscriptions and history requests.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::Timestamp;

/// Sampling resolution of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Raw ticks, no aggregation.
    Tick,
    /// One-second bars.
    Second,
    /// One-minute bars.
    Minute,
    /// One-hour bars.
    Hour,
    /// Daily bars.
    Daily,
}

impl Resolution {
    /// Bar period for this resolution. Ticks have a zero period.
    #[must_use]
    pub fn to_duration(self) -> Duration {
        match self {
            Self::Tick => Duration::zero(),
            Self::Second => Duration::seconds(1),
            Self::Minute => Duration::minutes(1),
            Self::Hour => Duration::hours(1),
            Self::Daily => Duration::days(1),
        }
    }

    /// Round an instant down to the start of its period.
    ///
    /// Tick resolution returns the instant unchanged.
    #[must_use]
    pub fn round_down(self, time: Timestamp) -> Timestamp {
        let period = self.to_duration().num_microseconds().unwrap_or(0);
        if period <= 0 || time == Timestamp::MAX || time == Timestamp::MIN {
            return time;
        }

        let micros = time.unix_micros();
        Timestamp::from_unix_micros(micros - micros.rem_euclid(period))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Resolution::Second, "2026-01-19T12:34:56.789Z", "2026-01-19T12:34:56Z")]
    #[test_case(Resolution::Minute, "2026-01-19T12:34:56Z", "2026-01-19T12:34:00Z")]
    #[test_case(Resolution::Hour, "2026-01-19T12:34:56Z", "2026-01-19T12:00:00Z")]
    #[test_case(Resolution::Daily, "2026-01-19T12:34:56Z", "2026-01-19T00:00:00Z")]
    #[test_case(Resolution::Tick, "2026-01-19T12:34:56.5Z", "2026-01-19T12:34:56.5Z")]
    fn round_down_to_period(resolution: Resolution, input: &str, expected: &str) {
        let input = Timestamp::parse(input).unwrap();
        let expected = Timestamp::parse(expected).unwrap();

        assert_eq!(resolution.round_down(input), expected);
    }

    #[test]
    fn round_down_before_epoch() {
        let input = Timestamp::parse("1969-12-31T23:59:30Z").unwrap();
        let expected = Timestamp::parse("1969-12-31T23:59:00Z").unwrap();

        assert_eq!(Resolution::Minute.round_down(input), expected);
    }

    #[test]
    fn tick_has_zero_period() {
        assert_eq!(Resolution::Tick.to_duration(), Duration::zero());
        assert_eq!(Resolution::Minute.to_duration(), Duration::seconds(60));
    }
}
