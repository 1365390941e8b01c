use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::{ApiRequest, ApiResponse, RefreshGate, Transport};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::notify::Toasts;
use crate::session::AuthState;

/// The full request chain: logging, then the refresh gate, then failure
/// reporting right above the wire.
pub struct Pipeline {
    gate: RefreshGate,
}

impl Pipeline {
    /// Stack the stages over `transport`.
    #[must_use]
    pub fn new(
        config: Arc<ClientConfig>,
        auth: AuthState,
        transport: Arc<dyn Transport>,
        toasts: Toasts,
    ) -> Self {
        let reporting = Arc::new(ErrorToasts {
            inner: transport,
            toasts,
        });
        Self {
            gate: RefreshGate::new(config, auth, reporting),
        }
    }

    /// The refresh gate underneath.
    #[must_use]
    pub const fn gate(&self) -> &RefreshGate {
        &self.gate
    }

    /// Send a request and fail on any non-2xx final answer.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` for non-success statuses (after any token
    /// refresh) and transport errors as-is. Every failed exchange on the wire,
    /// including a 401 that a refresh later recovers, has shown one toast
    /// unless the request is quiet.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = request.method.clone();
        let url = request.url.clone();
        let started = Instant::now();
        tracing::debug!(%method, %url, "request");

        let result = self
            .gate
            .execute(request)
            .await
            .and_then(ApiResponse::error_for_status);

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(response) => {
                tracing::debug!(%method, %url, status = response.status, elapsed_ms, "response");
            }
            Err(e) => tracing::debug!(%method, %url, error = %e, elapsed_ms, "request failed"),
        }
        result
    }
}

/// Shows a toast for every failed exchange and reports 5xx to Sentry.
///
/// Answers pass through unchanged; turning statuses into errors is left to
/// the caller.
struct ErrorToasts {
    inner: Arc<dyn Transport>,
    toasts: Toasts,
}

impl ErrorToasts {
    fn report(&self, request: &ApiRequest, error: &ClientError) {
        if !request.quiet {
            self.toasts
                .error(error.toast_message(), self.toasts.default_duration());
        }
        if error.is_server_error() {
            sentry::capture_error(error);
        }
    }
}

#[async_trait]
impl Transport for ErrorToasts {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let result = self.inner.send(request).await;
        match &result {
            Ok(response) if response.is_success() => {}
            Ok(response) => {
                let error = ClientError::from_response(response.status, &response.body);
                self.report(request, &error);
            }
            Err(e) => self.report(request, e),
        }
        result
    }
}
