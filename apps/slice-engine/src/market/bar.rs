//! Trade and quote bars.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Symbol, Timestamp};

/// Plain OHLC prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Opening price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Closing price.
    pub close: Decimal,
}

impl Bar {
    /// Create a new OHLC bar.
    #[must_use]
    pub const fn new(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    /// A bar where every price is `price`.
    #[must_use]
    pub const fn flat(price: Decimal) -> Self {
        Self::new(price, price, price, price)
    }
}

/// Trade bar: aggregated trades over `period` starting at `time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeBar {
    /// Instrument.
    pub symbol: Symbol,
    /// Bar open time.
    pub time: Timestamp,
    /// Bar length.
    #[serde(with = "period_millis")]
    pub period: Duration,
    /// Opening price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Closing price.
    pub close: Decimal,
    /// Traded volume.
    pub volume: Decimal,
}

impl TradeBar {
    /// Create a new trade bar.
    #[must_use]
    pub fn new(symbol: Symbol, time: Timestamp, period: Duration, prices: Bar, volume: Decimal) -> Self {
        Self {
            symbol,
            time,
            period,
            open: prices.open,
            high: prices.high,
            low: prices.low,
            close: prices.close,
            volume,
        }
    }

    /// Instant the bar becomes visible: open time plus period.
    #[must_use]
    pub fn end_time(&self) -> Timestamp {
        self.time.saturating_add(self.period)
    }
}

/// Quote bar: bid and ask OHLC over `period` starting at `time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteBar {
    /// Instrument.
    pub symbol: Symbol,
    /// Bar open time.
    pub time: Timestamp,
    /// Bar length.
    #[serde(with = "period_millis")]
    pub period: Duration,
    /// Bid side, if any bid was seen.
    pub bid: Option<Bar>,
    /// Ask side, if any ask was seen.
    pub ask: Option<Bar>,
    /// Last bid size.
    #[serde(default)]
    pub last_bid_size: Decimal,
    /// Last ask size.
    #[serde(default)]
    pub last_ask_size: Decimal,
}

impl QuoteBar {
    /// Create a new quote bar.
    #[must_use]
    pub const fn new(
        symbol: Symbol,
        time: Timestamp,
        period: Duration,
        bid: Option<Bar>,
        ask: Option<Bar>,
    ) -> Self {
        Self {
            symbol,
            time,
            period,
            bid,
            ask,
            last_bid_size: Decimal::ZERO,
            last_ask_size: Decimal::ZERO,
        }
    }

    /// Instant the bar becomes visible: open time plus period.
    #[must_use]
    pub fn end_time(&self) -> Timestamp {
        self.time.saturating_add(self.period)
    }

    /// Closing mid price, or the side that is present.
    #[must_use]
    pub fn close(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid.close + ask.close) / Decimal::TWO),
            (Some(bid), None) => Some(bid.close),
            (None, Some(ask)) => Some(ask.close),
            (None, None) => None,
        }
    }
}

/// Serialize bar periods as whole milliseconds.
mod period_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(period: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(period.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        Duration::try_milliseconds(millis)
            .ok_or_else(|| serde::de::Error::custom(format!("bar period out of range: {millis}ms")))
    }
}
