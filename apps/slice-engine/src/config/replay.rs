//! Replay input configuration.

use serde::{Deserialize, Serialize};

use crate::market::{DataKind, Symbol};
use crate::sync::SubscriptionId;

/// Replay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReplayConfig {
    /// One JSON-lines file per stream.
    #[serde(default)]
    pub inputs: Vec<ReplayInput>,
}

/// One replayed stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayInput {
    /// Path of the JSON-lines file.
    pub path: String,
    /// Instrument every line belongs to.
    pub symbol: String,
    /// Data kind of the stream.
    pub kind: DataKind,
    /// Custom kind name; required when `kind` is `custom`.
    #[serde(default)]
    pub custom_kind: Option<String>,
}

impl ReplayInput {
    /// Subscription this input feeds.
    #[must_use]
    pub fn subscription_id(&self) -> SubscriptionId {
        match &self.custom_kind {
            Some(name) if self.kind == DataKind::Custom => {
                SubscriptionId::custom(Symbol::new(&self.symbol), name.clone())
            }
            _ => SubscriptionId::new(Symbol::new(&self.symbol), self.kind),
        }
    }
}
