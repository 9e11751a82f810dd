//! Configuration loading, validation, and environment variable interpolation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use slice_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("replay.yaml"))?;
//!
//! println!("idle poll: {}ms", config.synchronizer.idle_poll_interval_ms);
//! ```

mod clock;
mod observability;
mod replay;
mod synchronizer;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use clock::{ClockConfig, ClockMode};
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use replay::{ReplayConfig, ReplayInput};
pub use synchronizer::SynchronizerConfig;

use crate::market::DataKind;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Frontier clock configuration.
    #[serde(default)]
    pub clock: ClockConfig,
    /// Synchronizer configuration.
    #[serde(default)]
    pub synchronizer: SynchronizerConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Replay inputs.
    #[serde(default)]
    pub replay: ReplayConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let sync = &config.synchronizer;

    if sync.idle_poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "synchronizer.idle_poll_interval_ms must be positive".to_string(),
        ));
    }

    if sync.event_channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "synchronizer.event_channel_capacity must be positive".to_string(),
        ));
    }

    match (config.clock.mode, config.clock.start_time()) {
        (_, Err(e)) => {
            return Err(ConfigError::ValidationError(format!(
                "clock.start is not an RFC 3339 instant: {e}"
            )));
        }
        (ClockMode::Real, Ok(Some(_))) => {
            return Err(ConfigError::ValidationError(
                "clock.start is only valid in manual mode".to_string(),
            ));
        }
        _ => {}
    }

    let valid_formats = ["json", "pretty"];
    let format = config.observability.logging.format.to_ascii_lowercase();
    if !valid_formats.contains(&format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    let mut seen = HashSet::new();
    for input in &config.replay.inputs {
        if input.path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "replay.inputs path must not be empty".to_string(),
            ));
        }
        if input.symbol.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "replay input '{}' has no symbol",
                input.path
            )));
        }
        if input.kind == DataKind::Custom && input.custom_kind.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "replay input '{}' is custom but names no custom_kind",
                input.path
            )));
        }
        let id = input.subscription_id();
        if !seen.insert(id.clone()) {
            return Err(ConfigError::ValidationError(format!(
                "replay input '{}' duplicates subscription {id}",
                input.path
            )));
        }
    }

    Ok(())
}
