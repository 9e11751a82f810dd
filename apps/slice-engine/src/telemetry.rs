//! Tracing subscriber setup.
//!
//! # Configuration
//!
//! - `RUST_LOG`: standard filter directives; overrides the configured level
//! - `observability.logging.level`: level for `slice_engine` when `RUST_LOG` is unset
//! - `observability.logging.format`: `json` or `pretty`
//!
//! # Usage
//!
//! ```rust,ignore
//! use slice_engine::{config::LoggingConfig, telemetry::init_tracing};
//!
//! init_tracing(&LoggingConfig::default())?;
//! ```

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Error returned when a global subscriber is already installed.
pub type TelemetryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber was already set.
pub fn init_tracing(logging: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| env_filter(&logging.level));

    if logging.is_json() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .try_init()
    }
}

/// Filter enabling `level` for this crate; falls back to `info` on a bad level.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("slice_engine={level}"))
        .unwrap_or_else(|_| EnvFilter::new("slice_engine=info"))
}
