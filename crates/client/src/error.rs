//! Unified error handling with Sentry integration.
//!
//! Every fallible SDK call returns `Result<T, ClientError>`. The request
//! pipeline turns failures into a toast once and then hands the error back
//! so callers can apply their own handling (for example rolling back an
//! optimistic cart change).

use medico_core::{EmailError, PhoneError, UserId};
use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Message shown when the backend rejects the session.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport failed (connection refused, timeout, TLS...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failure reported by a non-reqwest transport.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("Request failed ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// JSON (de)serialization failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Input rejected before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cart operation attempted by an administrator.
    #[error("Cart is not available for admin accounts")]
    AdminCartDisabled,

    /// Operation requires a signed-in user.
    #[error("Not signed in")]
    NotAuthenticated,

    /// Configuration invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// HTTP status of an API error, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend answered 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }

    /// Whether this is a 5xx answer from the backend.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 500)
    }

    /// Text for the generic failure toast.
    #[must_use]
    pub fn toast_message(&self) -> String {
        match self {
            Self::Api { status: 401, .. } => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::Api { status, message } => format!("Request failed ({status}): {message}"),
            Self::Http(e) => match e.status() {
                Some(status) => format!("Request failed ({}): {e}", status.as_u16()),
                None => format!("Request failed (unknown): {e}"),
            },
            Self::Network(message) => format!("Request failed (unknown): {message}"),
            other => other.to_string(),
        }
    }

    /// Build an API error from a status code and raw response body.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = extract_message(body).unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            if text.is_empty() {
                "Unexpected error".to_string()
            } else {
                text.chars().take(200).collect()
            }
        });
        Self::Api { status, message }
    }
}

impl From<EmailError> for ClientError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PhoneError> for ClientError {
    fn from(err: PhoneError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    message: Option<String>,
}

/// Pull `detail` (string or validation list) or `message` out of an error body.
fn extract_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;

    match parsed.detail {
        Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s),
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .map(String::from)
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    parsed.message.filter(|m| !m.is_empty())
}

/// Set the Sentry user context after a successful login.
pub fn set_sentry_user(user_id: UserId) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
