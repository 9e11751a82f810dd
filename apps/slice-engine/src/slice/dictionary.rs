//! Symbol-keyed containers used inside a slice.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::market::{Symbol, Tick};

/// One item of a kind per symbol, iterated in symbol order.
#[derive(Debug, Clone, PartialEq)]
pub struct DataDictionary<T> {
    items: BTreeMap<Symbol, T>,
}

impl<T> Default for DataDictionary<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T> DataDictionary<T> {
    /// Empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, returning the item it replaced.
    pub(crate) fn insert(&mut self, symbol: Symbol, item: T) -> Option<T> {
        self.items.insert(symbol, item)
    }

    /// Item for `symbol`.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<&T> {
        self.items.get(symbol)
    }

    /// Whether `symbol` has an item.
    #[must_use]
    pub fn contains_key(&self, symbol: &Symbol) -> bool {
        self.items.contains_key(symbol)
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Symbols present.
    pub fn keys(&self) -> impl Iterator<Item = &Symbol> {
        self.items.keys()
    }

    /// Items in symbol order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// `(symbol, item)` pairs in symbol order.
    pub fn iter(&self) -> btree_map::Iter<'_, Symbol, T> {
        self.items.iter()
    }
}

impl<'a, T> IntoIterator for &'a DataDictionary<T> {
    type Item = (&'a Symbol, &'a T);
    type IntoIter = btree_map::Iter<'a, Symbol, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Every tick per symbol, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ticks {
    items: BTreeMap<Symbol, Vec<Tick>>,
}

impl Ticks {
    pub(crate) fn push(&mut self, tick: Tick) {
        self.items.entry(tick.symbol.clone()).or_default().push(tick);
    }

    /// Ticks for `symbol`; empty when there are none.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> &[Tick] {
        self.items.get(symbol).map_or(&[], Vec::as_slice)
    }

    /// Number of symbols with at least one tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no ticks are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `(symbol, ticks)` pairs in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &[Tick])> {
        self.items.iter().map(|(symbol, ticks)| (symbol, ticks.as_slice()))
    }
}
