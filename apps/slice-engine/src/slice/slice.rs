//! Immutable snapshot of all data due at one instant.

use std::collections::BTreeMap;

use tracing::debug;

use super::dictionary::{DataDictionary, Ticks};
use crate::error::SliceError;
use crate::market::{CustomData, DataKind, DataPoint, QuoteBar, Symbol, Tick, Timestamp, TradeBar};

/// Capability of a built-in kind to be looked up in a [`Slice`] by type.
///
/// Implemented for the closed set [`TradeBar`], [`QuoteBar`] and [`Tick`].
/// Custom kinds are addressed by name through [`Slice::custom`].
pub trait SliceData: Sized {
    /// Kind tag of the implementing type.
    const KIND: DataKind;

    /// The slice container holding this kind.
    fn dictionary(slice: &Slice) -> &DataDictionary<Self>;
}

impl SliceData for TradeBar {
    const KIND: DataKind = DataKind::TradeBar;

    fn dictionary(slice: &Slice) -> &DataDictionary<Self> {
        &slice.bars
    }
}

impl SliceData for QuoteBar {
    const KIND: DataKind = DataKind::QuoteBar;

    fn dictionary(slice: &Slice) -> &DataDictionary<Self> {
        &slice.quote_bars
    }
}

/// Typed lookup yields the last tick per symbol; [`Slice::ticks_for`] has all.
impl SliceData for Tick {
    const KIND: DataKind = DataKind::Tick;

    fn dictionary(slice: &Slice) -> &DataDictionary<Self> {
        &slice.last_ticks
    }
}

/// Borrowed view of one item held by a slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliceItem<'a> {
    /// Trade bar.
    TradeBar(&'a TradeBar),
    /// Quote bar.
    QuoteBar(&'a QuoteBar),
    /// Tick.
    Tick(&'a Tick),
    /// Custom data.
    Custom(&'a CustomData),
}

impl SliceItem<'_> {
    /// Kind of the item.
    #[must_use]
    pub const fn kind(&self) -> DataKind {
        match self {
            Self::TradeBar(_) => DataKind::TradeBar,
            Self::QuoteBar(_) => DataKind::QuoteBar,
            Self::Tick(_) => DataKind::Tick,
            Self::Custom(_) => DataKind::Custom,
        }
    }

    /// Instrument of the item.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        match self {
            Self::TradeBar(bar) => &bar.symbol,
            Self::QuoteBar(bar) => &bar.symbol,
            Self::Tick(tick) => &tick.symbol,
            Self::Custom(data) => &data.symbol,
        }
    }

    /// Reporting end time of the item.
    #[must_use]
    pub fn end_time(&self) -> Timestamp {
        match self {
            Self::TradeBar(bar) => bar.end_time(),
            Self::QuoteBar(bar) => bar.end_time(),
            Self::Tick(tick) => tick.end_time(),
            Self::Custom(data) => data.end_time,
        }
    }

    /// Clone into an owned [`DataPoint`].
    #[must_use]
    pub fn to_data_point(&self) -> DataPoint {
        match self {
            Self::TradeBar(bar) => DataPoint::TradeBar((*bar).clone()),
            Self::QuoteBar(bar) => DataPoint::QuoteBar((*bar).clone()),
            Self::Tick(tick) => DataPoint::Tick((*tick).clone()),
            Self::Custom(data) => DataPoint::Custom((*data).clone()),
        }
    }
}

/// Which container holds a symbol's canonical item.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Canonical {
    Builtin(DataKind),
    Custom(String),
}

/// All data valid at one instant, indexed by kind and by symbol.
///
/// Built once and never mutated. Each built-in kind keeps at most one item per
/// symbol, except ticks which keep every print in arrival order. A symbol-only
/// lookup returns the canonical item by [`DataKind::PRECEDENCE`].
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    time: Timestamp,
    bars: DataDictionary<TradeBar>,
    quote_bars: DataDictionary<QuoteBar>,
    ticks: Ticks,
    last_ticks: DataDictionary<Tick>,
    custom: BTreeMap<String, DataDictionary<CustomData>>,
    canonical: BTreeMap<Symbol, Canonical>,
    data_count: usize,
}

impl Slice {
    /// Group `data` by kind and build the canonical symbol index.
    pub fn new(time: Timestamp, data: impl IntoIterator<Item = DataPoint>) -> Self {
        let mut slice = Self {
            time,
            bars: DataDictionary::new(),
            quote_bars: DataDictionary::new(),
            ticks: Ticks::default(),
            last_ticks: DataDictionary::new(),
            custom: BTreeMap::new(),
            canonical: BTreeMap::new(),
            data_count: 0,
        };

        for point in data {
            slice.data_count += 1;
            match point {
                DataPoint::TradeBar(bar) => {
                    if slice.bars.insert(bar.symbol.clone(), bar).is_some() {
                        slice.data_count -= 1;
                        debug!(time = %time, kind = "trade_bar", "Duplicate item replaced in slice");
                    }
                }
                DataPoint::QuoteBar(bar) => {
                    if slice.quote_bars.insert(bar.symbol.clone(), bar).is_some() {
                        slice.data_count -= 1;
                        debug!(time = %time, kind = "quote_bar", "Duplicate item replaced in slice");
                    }
                }
                DataPoint::Tick(tick) => {
                    slice.last_ticks.insert(tick.symbol.clone(), tick.clone());
                    slice.ticks.push(tick);
                }
                DataPoint::Custom(data) => {
                    let container = slice.custom.entry(data.kind.clone()).or_default();
                    if container.insert(data.symbol.clone(), data).is_some() {
                        slice.data_count -= 1;
                        debug!(time = %time, kind = "custom", "Duplicate item replaced in slice");
                    }
                }
            }
        }

        slice.canonical = slice.build_canonical_index();
        slice
    }

    /// Empty slice at `time`.
    #[must_use]
    pub fn empty(time: Timestamp) -> Self {
        Self::new(time, std::iter::empty())
    }

    fn build_canonical_index(&self) -> BTreeMap<Symbol, Canonical> {
        let mut index = BTreeMap::new();

        for kind in DataKind::PRECEDENCE {
            match kind {
                DataKind::TradeBar => {
                    for symbol in self.bars.keys() {
                        index.entry(symbol.clone()).or_insert(Canonical::Builtin(kind));
                    }
                }
                DataKind::QuoteBar => {
                    for symbol in self.quote_bars.keys() {
                        index.entry(symbol.clone()).or_insert(Canonical::Builtin(kind));
                    }
                }
                DataKind::Tick => {
                    for symbol in self.last_ticks.keys() {
                        index.entry(symbol.clone()).or_insert(Canonical::Builtin(kind));
                    }
                }
                DataKind::Custom => {
                    for (name, container) in &self.custom {
                        for symbol in container.keys() {
                            index
                                .entry(symbol.clone())
                                .or_insert_with(|| Canonical::Custom(name.clone()));
                        }
                    }
                }
            }
        }

        index
    }

    /// Slice timestamp.
    #[must_use]
    pub const fn time(&self) -> Timestamp {
        self.time
    }

    /// Whether the slice holds any data.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.data_count > 0
    }

    /// Number of stored data points, counting every tick.
    #[must_use]
    pub const fn data_count(&self) -> usize {
        self.data_count
    }

    /// Number of distinct symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Whether no symbol is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Whether any kind of data exists for `symbol`.
    #[must_use]
    pub fn contains_symbol(&self, symbol: &Symbol) -> bool {
        self.canonical.contains_key(symbol)
    }

    /// Symbols present, in order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.canonical.keys()
    }

    /// All items of kind `T`, keyed by symbol.
    #[must_use]
    pub fn get<T: SliceData>(&self) -> &DataDictionary<T> {
        T::dictionary(self)
    }

    /// The item of kind `T` for `symbol`.
    pub fn get_for<T: SliceData>(&self, symbol: &Symbol) -> Result<&T, SliceError> {
        T::dictionary(self)
            .get(symbol)
            .ok_or_else(|| SliceError::missing_kind(symbol.clone(), T::KIND))
    }

    /// Trade bars.
    #[must_use]
    pub const fn bars(&self) -> &DataDictionary<TradeBar> {
        &self.bars
    }

    /// Quote bars.
    #[must_use]
    pub const fn quote_bars(&self) -> &DataDictionary<QuoteBar> {
        &self.quote_bars
    }

    /// Every tick, per symbol.
    #[must_use]
    pub const fn ticks(&self) -> &Ticks {
        &self.ticks
    }

    /// Ticks for `symbol` in arrival order; empty when there are none.
    #[must_use]
    pub fn ticks_for(&self, symbol: &Symbol) -> &[Tick] {
        self.ticks.get(symbol)
    }

    /// Items of the named custom kind; `None` when the kind is absent.
    #[must_use]
    pub fn custom(&self, kind: &str) -> Option<&DataDictionary<CustomData>> {
        self.custom.get(kind)
    }

    /// Names of the custom kinds present.
    pub fn custom_kinds(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }

    /// The named custom item for `symbol`.
    pub fn custom_for(&self, kind: &str, symbol: &Symbol) -> Result<&CustomData, SliceError> {
        self.custom
            .get(kind)
            .and_then(|container| container.get(symbol))
            .ok_or_else(|| SliceError::missing_custom(symbol.clone(), kind))
    }

    /// Canonical item for `symbol`, chosen by kind precedence.
    pub fn get_symbol(&self, symbol: &Symbol) -> Result<SliceItem<'_>, SliceError> {
        self.canonical
            .get(symbol)
            .and_then(|canonical| self.resolve(symbol, canonical))
            .ok_or_else(|| SliceError::missing_symbol(symbol.clone()))
    }

    fn resolve(&self, symbol: &Symbol, canonical: &Canonical) -> Option<SliceItem<'_>> {
        match canonical {
            Canonical::Builtin(DataKind::TradeBar) => self.bars.get(symbol).map(SliceItem::TradeBar),
            Canonical::Builtin(DataKind::QuoteBar) => {
                self.quote_bars.get(symbol).map(SliceItem::QuoteBar)
            }
            Canonical::Builtin(DataKind::Tick) => self.last_ticks.get(symbol).map(SliceItem::Tick),
            Canonical::Builtin(DataKind::Custom) => None,
            Canonical::Custom(name) => self
                .custom
                .get(name)
                .and_then(|container| container.get(symbol))
                .map(SliceItem::Custom),
        }
    }

    /// One `(symbol, canonical item)` entry per symbol.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, SliceItem<'_>)> {
        self.canonical
            .iter()
            .filter_map(|(symbol, canonical)| Some((symbol, self.resolve(symbol, canonical)?)))
    }

    /// Every stored item: bars, quote bars, each tick, then custom kinds.
    pub fn data_points(&self) -> impl Iterator<Item = SliceItem<'_>> {
        let bars = self.bars.values().map(SliceItem::TradeBar);
        let quote_bars = self.quote_bars.values().map(SliceItem::QuoteBar);
        let ticks = self
            .ticks
            .iter()
            .flat_map(|(_, ticks)| ticks.iter().map(SliceItem::Tick));
        let custom = self
            .custom
            .values()
            .flat_map(|container| container.values().map(SliceItem::Custom));

        bars.chain(quote_bars).chain(ticks).chain(custom)
    }
}

impl<'a> IntoIterator for &'a Slice {
    type Item = (&'a Symbol, SliceItem<'a>);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
