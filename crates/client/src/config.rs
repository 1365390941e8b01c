//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MEDICO_API_BASE_URL` - Base URL of the medico-store REST backend (e.g. `http://localhost:8000`)
//!
//! ## Optional
//! - `MEDICO_STORAGE_DIR` - Directory for persisted client state (default: `.medico`)
//! - `MEDICO_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `MEDICO_TOAST_DURATION_MS` - How long notifications stay visible (default: 1500)
//! - `MEDICO_SYMPTOM_DELAY_MS` - Simulated symptom-checker "typing" delay (default: 1000)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_DIR: &str = ".medico";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOAST_DURATION_MS: u64 = 1500;
const DEFAULT_SYMPTOM_DELAY_MS: u64 = 1000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Medico client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash
    pub api_base_url: String,
    /// Directory holding persisted user and cart records
    pub storage_dir: PathBuf,
    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,
    /// Default lifetime of a toast notification
    pub toast_duration: Duration,
    /// Delay before the symptom checker answers
    pub symptom_delay: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Build a configuration for `api_base_url` with every other setting at its default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL is not an absolute
    /// `http`/`https` URL.
    pub fn new(api_base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_base_url("MEDICO_API_BASE_URL", api_base_url)?,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            toast_duration: Duration::from_millis(DEFAULT_TOAST_DURATION_MS),
            symptom_delay: Duration::from_millis(DEFAULT_SYMPTOM_DELAY_MS),
            sentry_dsn: None,
        })
    }

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

        let base_url = get_required_env("MEDICO_API_BASE_URL")?;
        let mut config = Self::new(&base_url)?;

        config.storage_dir = PathBuf::from(get_env_or_default(
            "MEDICO_STORAGE_DIR",
            DEFAULT_STORAGE_DIR,
        ));
        config.http_timeout = Duration::from_secs(get_u64_or_default(
            "MEDICO_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        config.toast_duration = Duration::from_millis(get_u64_or_default(
            "MEDICO_TOAST_DURATION_MS",
            DEFAULT_TOAST_DURATION_MS,
        )?);
        config.symptom_delay = Duration::from_millis(get_u64_or_default(
            "MEDICO_SYMPTOM_DELAY_MS",
            DEFAULT_SYMPTOM_DELAY_MS,
        )?);
        config.sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(config)
    }

    /// Absolute URL for a backend path such as `/cart/`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base_url)
    }

    /// Whether `url` is addressed to the configured backend.
    #[must_use]
    pub fn is_backend(&self, url: &str) -> bool {
        url.strip_prefix(&self.api_base_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a numeric environment variable with a default value.
fn get_u64_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |value| parse_u64(key, &value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate a backend base URL and normalize away the trailing slash.
fn parse_base_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "URL must have a host".to_string(),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "URL must not carry a query or fragment".to_string(),
        ));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}
