//! HTTP request pipeline.
//!
//! Every backend call flows through three stages, outermost first:
//!
//! 1. logging - method, URL and elapsed time at `debug` level
//! 2. refresh gate - attaches the bearer token and credential flag, and on a
//!    401 runs a single shared token refresh before replaying the request
//! 3. error toast - one toast for each failed exchange on the wire, so a 401
//!    shows the session-expired text even when the replay then succeeds
//!
//! Non-success final answers come back to the caller as [`ClientError`].
//!
//! The wire itself sits behind the [`Transport`] trait so tests can swap in
//! an in-process backend.

mod gate;
mod pipeline;

pub use gate::{ADMIN_LOGIN_PATH, REFRESH_PATH, RefreshGate, TokenResponse};
pub use pipeline::Pipeline;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::cookie::Jar;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};

/// A file sent as a multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

/// Request payload.
///
/// Kept as plain data (rather than a `reqwest` body) so a request can be
/// replayed after a token refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(FilePart),
}

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
    /// Bearer token; set by the refresh gate for backend URLs.
    pub bearer: Option<SecretString>,
    /// Send cookies (the refresh cookie lives here).
    pub with_credentials: bool,
    /// Skip the generic failure toast; the caller shows its own.
    pub quiet: bool,
}

impl ApiRequest {
    /// A request with no body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: RequestBody::Empty,
            bearer: None,
            with_credentials: false,
            quiet: false,
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Attach a single-file multipart body.
    #[must_use]
    pub fn multipart(mut self, part: FilePart) -> Self {
        self.body = RequestBody::Multipart(part);
        self
    }

    /// Suppress the generic failure toast.
    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Whether the URL path ends at `path` (ignoring any query string).
    #[must_use]
    pub fn targets(&self, path: &str) -> bool {
        let without_query = self.url.split(['?', '#']).next().unwrap_or_default();
        without_query.ends_with(path)
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Build a response from a status and body bytes.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Turn a non-2xx response into an error.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` carrying the status and server message.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_response(self.status, &self.body))
        }
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Parse` if the body is not the expected shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Moves a request over the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return whatever status the server answered with.
    ///
    /// Only transport-level failures are errors; a 4xx/5xx is a response.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// `reqwest`-backed transport.
///
/// Credentialed requests share one cookie jar; plain requests use a client
/// without cookies.
pub struct ReqwestTransport {
    credentialed: reqwest::Client,
    plain: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let credentialed = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(timeout)
            .user_agent(concat!("medico-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let plain = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("medico-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            credentialed,
            plain,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let client = if request.with_credentials {
            &self.credentialed
        } else {
            &self.plain
        };

        let mut builder = client.request(request.method.clone(), &request.url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(part) => {
                let mut file = reqwest::multipart::Part::bytes(part.bytes.clone())
                    .file_name(part.file_name.clone());
                if let Some(mime) = &part.mime {
                    file = file.mime_str(mime)?;
                }
                builder.multipart(reqwest::multipart::Form::new().part(part.field.clone(), file))
            }
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(ApiResponse { status, body })
    }
}
