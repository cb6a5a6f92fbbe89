//! Tracing/logging initialization.
//!
//! `RUST_LOG` selects what is recorded (default `info`); `ECOFINDS_LOG_FORMAT`
//! selects `json` (default) or `compact` single-line text for local runs.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "info";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Compact,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log format '{0}' (expected json or compact)")]
pub struct ParseLogFormatError(String);

impl FromStr for LogFormat {
    type Err = ParseLogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "compact" | "text" => Ok(Self::Compact),
            other => Err(ParseLogFormatError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset or unparsable.
    pub default_directive: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_directive: DEFAULT_DIRECTIVE.to_string(),
        }
    }
}

impl LogConfig {
    /// An unknown `ECOFINDS_LOG_FORMAT` falls back to JSON rather than failing startup.
    pub fn from_env() -> Self {
        let format = std::env::var("ECOFINDS_LOG_FORMAT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        Self {
            format,
            ..Self::default()
        }
    }
}

/// Install the global subscriber. Returns `false` if one was already installed.
pub fn init(config: LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    match config.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Compact => builder.compact().try_init().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("json".parse(), Ok(LogFormat::Json));
        assert_eq!(" Compact ".parse(), Ok(LogFormat::Compact));
        assert_eq!("text".parse(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn second_init_is_a_noop() {
        let _ = init(LogConfig::default());
        assert!(!init(LogConfig::default()));
    }
}
