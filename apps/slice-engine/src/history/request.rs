//! History requests and lookback planning.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::error::HistoryError;
use crate::market::{DataKind, Resolution, Symbol, Timestamp};
use crate::sync::SubscriptionId;

/// Request for one subscription's data over `[start, end]`, by end time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Instrument.
    pub symbol: Symbol,
    /// Data kind.
    pub kind: DataKind,
    /// Custom kind name, set only for [`DataKind::Custom`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_kind: Option<String>,
    /// Resolution of the requested data.
    pub resolution: Resolution,
    /// Earliest end time to include.
    pub start: Timestamp,
    /// Latest end time to include.
    pub end: Timestamp,
}

impl HistoryRequest {
    /// Request a built-in kind.
    pub fn new(
        symbol: impl Into<Symbol>,
        kind: DataKind,
        resolution: Resolution,
        start: Timestamp,
        end: Timestamp,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
            custom_kind: None,
            resolution,
            start,
            end,
        }
    }

    /// Request the data of an existing subscription.
    #[must_use]
    pub fn for_subscription(
        id: &SubscriptionId,
        resolution: Resolution,
        start: Timestamp,
        end: Timestamp,
    ) -> Self {
        Self {
            symbol: id.symbol.clone(),
            kind: id.kind,
            custom_kind: id.custom_kind.clone(),
            resolution,
            start,
            end,
        }
    }

    /// Request the last `periods` bars of `id` ending at or before `now`.
    ///
    /// The end is rounded down to the resolution period so a partial bar is
    /// never requested.
    #[must_use]
    pub fn lookback(id: &SubscriptionId, resolution: Resolution, now: Timestamp, periods: u32) -> Self {
        let end = resolution.round_down(now);
        let span = resolution
            .to_duration()
            .checked_mul(i32::try_from(periods).unwrap_or(i32::MAX))
            .unwrap_or(Duration::MAX);
        let start = end.saturating_add(-span);
        Self::for_subscription(id, resolution, start, end)
    }

    /// Subscription this request reads.
    #[must_use]
    pub fn subscription_id(&self) -> SubscriptionId {
        SubscriptionId {
            symbol: self.symbol.clone(),
            kind: self.kind,
            custom_kind: self.custom_kind.clone(),
        }
    }

    /// Whether an end time falls inside the request.
    #[must_use]
    pub fn covers(&self, end_time: Timestamp) -> bool {
        self.start <= end_time && end_time <= self.end
    }

    /// Reject a request whose range is inverted.
    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.start > self.end {
            return Err(HistoryError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Plan one lookback request per symbol.
///
/// For each symbol the finest resolution among its subscriptions is used, and
/// the subscription with the highest kind precedence is read, so the selection
/// does not depend on input order.
pub fn lookback_requests<'a>(
    subscriptions: impl IntoIterator<Item = (&'a SubscriptionId, Resolution)>,
    now: Timestamp,
    periods: u32,
) -> Vec<HistoryRequest> {
    let mut by_symbol: BTreeMap<&Symbol, (&SubscriptionId, Resolution)> = BTreeMap::new();

    for (id, resolution) in subscriptions {
        by_symbol
            .entry(&id.symbol)
            .and_modify(|(chosen, finest)| {
                *finest = (*finest).min(resolution);
                if (id.kind, &id.custom_kind) < (chosen.kind, &chosen.custom_kind) {
                    *chosen = id;
                }
            })
            .or_insert((id, resolution));
    }

    by_symbol
        .into_values()
        .map(|(id, resolution)| HistoryRequest::lookback(id, resolution, now, periods))
        .collect()
}
