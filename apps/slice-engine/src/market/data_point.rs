//! Tagged union over the closed set of market data kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{CustomData, QuoteBar, Symbol, Tick, Timestamp, TradeBar};

/// Kind of a data point.
///
/// Variant order is the canonical precedence used when a slice is indexed by
/// symbol alone: trade bar, then quote bar, then tick, then custom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// [`TradeBar`].
    TradeBar,
    /// [`QuoteBar`].
    QuoteBar,
    /// [`Tick`].
    Tick,
    /// [`CustomData`].
    Custom,
}

impl DataKind {
    /// Every kind, highest precedence first.
    pub const PRECEDENCE: [Self; 4] = [Self::TradeBar, Self::QuoteBar, Self::Tick, Self::Custom];

    /// Stable lowercase name, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TradeBar => "trade_bar",
            Self::QuoteBar => "quote_bar",
            Self::Tick => "tick",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One market data point of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DataPoint {
    /// Trade bar.
    TradeBar(TradeBar),
    /// Quote bar.
    QuoteBar(QuoteBar),
    /// Tick.
    Tick(Tick),
    /// Custom data.
    Custom(CustomData),
}

impl DataPoint {
    /// Kind of this point.
    #[must_use]
    pub const fn kind(&self) -> DataKind {
        match self {
            Self::TradeBar(_) => DataKind::TradeBar,
            Self::QuoteBar(_) => DataKind::QuoteBar,
            Self::Tick(_) => DataKind::Tick,
            Self::Custom(_) => DataKind::Custom,
        }
    }

    /// Instrument this point refers to.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        match self {
            Self::TradeBar(bar) => &bar.symbol,
            Self::QuoteBar(bar) => &bar.symbol,
            Self::Tick(tick) => &tick.symbol,
            Self::Custom(data) => &data.symbol,
        }
    }

    /// Period start (tick print time for ticks).
    #[must_use]
    pub const fn time(&self) -> Timestamp {
        match self {
            Self::TradeBar(bar) => bar.time,
            Self::QuoteBar(bar) => bar.time,
            Self::Tick(tick) => tick.time,
            Self::Custom(data) => data.time,
        }
    }

    /// Reporting end time: the earliest instant this point may be observed.
    #[must_use]
    pub fn end_time(&self) -> Timestamp {
        match self {
            Self::TradeBar(bar) => bar.end_time(),
            Self::QuoteBar(bar) => bar.end_time(),
            Self::Tick(tick) => tick.end_time(),
            Self::Custom(data) => data.end_time,
        }
    }

    /// Custom type name, for custom points.
    #[must_use]
    pub fn custom_kind(&self) -> Option<&str> {
        match self {
            Self::Custom(data) => Some(&data.kind),
            _ => None,
        }
    }
}

impl From<TradeBar> for DataPoint {
    fn from(value: TradeBar) -> Self {
        Self::TradeBar(value)
    }
}

impl From<QuoteBar> for DataPoint {
    fn from(value: QuoteBar) -> Self {
        Self::QuoteBar(value)
    }
}

impl From<Tick> for DataPoint {
    fn from(value: Tick) -> Self {
        Self::Tick(value)
    }
}

impl From<CustomData> for DataPoint {
    fn from(value: CustomData) -> Self {
        Self::Custom(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::market::Bar;

    #[test]
    fn precedence_matches_ordering() {
        let mut kinds = vec![DataKind::Custom, DataKind::Tick, DataKind::TradeBar, DataKind::QuoteBar];
        kinds.sort();
        assert_eq!(kinds, DataKind::PRECEDENCE);
    }

    #[test]
    fn data_point_json_is_tagged_by_kind() {
        let line = r#"{"kind":"tick","data":{"symbol":"SPY","time":"2026-01-19T14:30:00Z","value":"470"}}"#;
        let point: DataPoint = serde_json::from_str(line).unwrap();

        assert_eq!(point.kind(), DataKind::Tick);
        assert_eq!(point.symbol().as_str(), "SPY");
    }

    #[test]
    fn data_point_end_time_per_kind() {
        let time = Timestamp::parse("2026-01-19T14:30:00Z").unwrap();
        let bar: DataPoint = TradeBar::new(
            Symbol::new("SPY"),
            time,
            Duration::minutes(1),
            Bar::flat(dec!(470)),
            dec!(10),
        )
        .into();
        let tick: DataPoint = Tick::trade(Symbol::new("SPY"), time, dec!(470), dec!(1)).into();

        assert_eq!(bar.end_time(), time.saturating_add(Duration::minutes(1)));
        assert_eq!(tick.end_time(), time);
        assert_eq!(bar.time(), tick.time());
    }
}
