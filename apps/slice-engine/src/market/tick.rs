//! Tick-level market data.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Symbol, Timestamp};

/// Kind of tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TickType {
    /// Executed trade.
    #[default]
    Trade,
    /// Top-of-book quote update.
    Quote,
}

/// A single trade or quote print. Visible at `time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument.
    pub symbol: Symbol,
    /// Print time.
    pub time: Timestamp,
    /// Trade or quote.
    #[serde(default)]
    pub tick_type: TickType,
    /// Trade price, or mid for quotes.
    pub value: Decimal,
    /// Trade size.
    #[serde(default)]
    pub quantity: Decimal,
    /// Best bid.
    #[serde(default)]
    pub bid_price: Decimal,
    /// Best ask.
    #[serde(default)]
    pub ask_price: Decimal,
    /// Bid size.
    #[serde(default)]
    pub bid_size: Decimal,
    /// Ask size.
    #[serde(default)]
    pub ask_size: Decimal,
}

impl Tick {
    /// Create a trade tick.
    #[must_use]
    pub const fn trade(symbol: Symbol, time: Timestamp, price: Decimal, quantity: Decimal) -> Self {
        Self {
            symbol,
            time,
            tick_type: TickType::Trade,
            value: price,
            quantity,
            bid_price: Decimal::ZERO,
            ask_price: Decimal::ZERO,
            bid_size: Decimal::ZERO,
            ask_size: Decimal::ZERO,
        }
    }

    /// Create a quote tick. `value` is the mid price.
    #[must_use]
    pub fn quote(symbol: Symbol, time: Timestamp, bid: Decimal, ask: Decimal) -> Self {
        Self {
            symbol,
            time,
            tick_type: TickType::Quote,
            value: (bid + ask) / Decimal::TWO,
            quantity: Decimal::ZERO,
            bid_price: bid,
            ask_price: ask,
            bid_size: Decimal::ZERO,
            ask_size: Decimal::ZERO,
        }
    }

    /// Ticks are visible at their print time.
    #[must_use]
    pub const fn end_time(&self) -> Timestamp {
        self.time
    }
}
