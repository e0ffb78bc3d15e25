//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPFRONT_API_BASE_URL` - Base URL of the storefront REST API
//!   (e.g., `https://api.example.vn/api/v1`)
//!
//! ## Optional
//! - `SHOPFRONT_STORAGE_PATH` - JSON file for persisted tokens (in-memory if unset)
//! - `SHOPFRONT_CONNECT_TIMEOUT_SECS` - Transport connect timeout (none if unset)
//! - `SHOPFRONT_USER_AGENT` - User agent header (default: `shopfront/<version>`)
//! - `SHOPFRONT_LOG_FORMAT` - `text` or `json` (default: `text`)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::telemetry::LogFormat;

const DEFAULT_USER_AGENT: &str = concat!("shopfront/", env!("CARGO_PKG_VERSION"));

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL that relative request paths are joined onto
    pub api_base_url: Url,
    /// Where tokens and the user profile are persisted
    pub storage_path: Option<PathBuf>,
    /// Connect timeout for the HTTP transport
    pub connect_timeout: Option<Duration>,
    /// Value of the `User-Agent` header
    pub user_agent: String,
    /// Log line format for [`telemetry::init`](crate::telemetry::init)
    pub log_format: LogFormat,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_base_url = get_required(&lookup, "SHOPFRONT_API_BASE_URL")?;
        let api_base_url = parse_base_url(&raw_base_url).map_err(|reason| {
            ConfigError::InvalidEnvVar("SHOPFRONT_API_BASE_URL".to_string(), reason)
        })?;

        let storage_path = get_optional(&lookup, "SHOPFRONT_STORAGE_PATH").map(PathBuf::from);

        let connect_timeout = get_optional(&lookup, "SHOPFRONT_CONNECT_TIMEOUT_SECS")
            .map(|value| {
                value.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "SHOPFRONT_CONNECT_TIMEOUT_SECS".to_string(),
                        e.to_string(),
                    )
                })
            })
            .transpose()?;

        let user_agent = get_optional(&lookup, "SHOPFRONT_USER_AGENT")
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let log_format = get_optional(&lookup, "SHOPFRONT_LOG_FORMAT")
            .map(|value| {
                value.parse::<LogFormat>().map_err(|reason| {
                    ConfigError::InvalidEnvVar("SHOPFRONT_LOG_FORMAT".to_string(), reason)
                })
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            api_base_url,
            storage_path,
            connect_timeout,
            user_agent,
            log_format,
        })
    }

    /// Configuration with defaults for everything but the base URL.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            storage_path: None,
            connect_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable, treating empty values as missing.
fn get_required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get_optional(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional variable, treating empty values as unset.
fn get_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse and validate the API base URL.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{other}'")),
    }
    if url.host_str().is_none() {
        return Err("base URL must have a host".to_string());
    }
    Ok(url)
}
