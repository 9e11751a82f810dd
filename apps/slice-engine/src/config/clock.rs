//! Clock configuration.

use serde::{Deserialize, Serialize};

use crate::market::Timestamp;

/// Which time provider drives the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// System clock; data is released as wall time passes.
    #[default]
    Real,
    /// Fixed instant; data up to it is released, then the session ends.
    Manual,
}

/// Clock configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClockConfig {
    /// Time provider.
    #[serde(default)]
    pub mode: ClockMode,
    /// RFC 3339 frontier for manual mode. Unset means no limit.
    #[serde(default)]
    pub start: Option<String>,
}

impl ClockConfig {
    /// Parsed manual start instant.
    ///
    /// # Errors
    ///
    /// Returns the parse error of a malformed `start`.
    pub fn start_time(&self) -> Result<Option<Timestamp>, chrono::ParseError> {
        self.start.as_deref().map(Timestamp::parse).transpose()
    }
}
