//! Subscriber setup for binaries and tests embedding the client.
//!
//! The library itself only emits `tracing` events; nothing here runs unless
//! the embedding application calls [`init`] or [`init_from_config`].

use std::str::FromStr;

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ClientConfig;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event, fields flattened.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Install a global subscriber.
///
/// `RUST_LOG` takes precedence over `default_directives`.
///
/// # Errors
///
/// Returns `TryInitError` if a global subscriber is already installed.
pub fn init(default_directives: &str, format: LogFormat) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives.into());

    let json_layer = (format == LogFormat::Json)
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (format == LogFormat::Text).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
}

/// Install a global subscriber in the format named by `SHOPFRONT_LOG_FORMAT`.
///
/// # Errors
///
/// Returns `TryInitError` if a global subscriber is already installed.
pub fn init_from_config(
    config: &ClientConfig,
    default_directives: &str,
) -> Result<(), TryInitError> {
    init(default_directives, config.log_format)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_format() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" text ".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_init_from_config_installs_once() {
        let config = ClientConfig::from_lookup(|key| match key {
            "SHOPFRONT_API_BASE_URL" => Some("http://localhost:8000".to_string()),
            "SHOPFRONT_LOG_FORMAT" => Some("json".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.log_format, LogFormat::Json);

        assert!(init_from_config(&config, "shopfront_client=debug").is_ok());
        assert!(init_from_config(&config, "shopfront_client=debug").is_err());
    }
}
