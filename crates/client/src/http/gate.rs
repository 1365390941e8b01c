//! Bearer token attachment and single-flight token refresh.
//!
//! The access token is short-lived. When a backend call comes back 401 the
//! gate asks `/auth/refresh` (authenticated by the refresh cookie) for a new
//! one and replays the call. Concurrent 401s share one refresh: the first
//! caller runs it, everyone else parks on a oneshot until it settles.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::oneshot;

use super::{ApiRequest, ApiResponse, Transport};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::AuthState;

/// Path of the token refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Path of the admin login endpoint. A 401 here means bad credentials.
pub const ADMIN_LOGIN_PATH: &str = "/auth/admin-login";

/// Body of a successful `/auth/refresh` call.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: SecretString,
}

enum GateState {
    Idle,
    Refreshing(Vec<oneshot::Sender<bool>>),
}

/// Attaches credentials to backend calls and recovers from expired tokens.
pub struct RefreshGate {
    config: Arc<ClientConfig>,
    auth: AuthState,
    transport: Arc<dyn Transport>,
    state: Mutex<GateState>,
}

impl RefreshGate {
    /// Create a gate over `transport`.
    #[must_use]
    pub fn new(config: Arc<ClientConfig>, auth: AuthState, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            auth,
            transport,
            state: Mutex::new(GateState::Idle),
        }
    }

    /// Send `request`, refreshing the token and replaying once on a 401.
    ///
    /// A failed refresh signs the user out and the original 401 response is
    /// returned as-is. A 401 that arrives after a logout or a new login is
    /// never replayed.
    ///
    /// # Errors
    ///
    /// Only transport-level failures are errors; HTTP statuses are returned
    /// in the response.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        if !self.config.is_backend(&request.url) {
            return self.transport.send(&request).await;
        }

        request.with_credentials = true;
        let sent = self.auth.credentials();
        request.bearer = sent.token;

        let response = self.transport.send(&request).await?;
        if response.status != 401 || !is_refreshable(&request) {
            return Ok(response);
        }
        let Some(sent_with) = request.bearer.take() else {
            return Ok(response);
        };

        let current = self.auth.credentials();
        if current.generation != sent.generation {
            tracing::debug!(url = %request.url, "signed in user changed while in flight, not replaying");
            return Ok(response);
        }
        let refreshed = match current.token {
            // Another caller already rotated the token while this one was in flight.
            Some(token) if token.expose_secret() != sent_with.expose_secret() => true,
            Some(_) => self.refresh_once().await,
            None => false,
        };
        if !refreshed {
            return Ok(response);
        }
        let Some(token) = self.auth.token_for(sent.generation) else {
            return Ok(response);
        };

        request.bearer = Some(token);
        tracing::debug!(url = %request.url, "replaying request with refreshed token");
        self.transport.send(&request).await
    }

    /// Refresh the access token now, joining a refresh already in flight.
    ///
    /// Returns whether a fresh token is in place. On failure the user has
    /// been signed out, unless someone else signed in meanwhile.
    pub async fn refresh_once(&self) -> bool {
        let waiter = {
            let mut state = self.lock();
            match &mut *state {
                GateState::Idle => {
                    *state = GateState::Refreshing(Vec::new());
                    None
                }
                GateState::Refreshing(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
            }
        };

        if let Some(rx) = waiter {
            return rx.await.unwrap_or(false);
        }

        let mut flight = InFlight {
            gate: self,
            succeeded: false,
        };
        let succeeded = self.refresh().await;
        flight.succeeded = succeeded;
        succeeded
    }

    async fn refresh(&self) -> bool {
        let credentials = self.auth.credentials();
        let mut request =
            ApiRequest::new(Method::POST, self.config.endpoint(REFRESH_PATH)).quiet();
        request.with_credentials = true;
        request.bearer = credentials.token;

        let token = match self.transport.send(&request).await {
            Ok(response) => response
                .error_for_status()
                .and_then(|r| r.json::<TokenResponse>()),
            Err(e) => Err(e),
        };

        match token {
            Ok(token) => {
                if !self
                    .auth
                    .rotate_access_token(credentials.generation, token.access_token)
                {
                    tracing::info!("session changed during token refresh, discarding new token");
                    return false;
                }
                tracing::info!("access token refreshed");
                true
            }
            Err(e) => {
                log_refresh_failure(&e);
                self.auth.expire(credentials.generation);
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_refreshable(request: &ApiRequest) -> bool {
    request.bearer.is_some()
        && !request.targets(REFRESH_PATH)
        && !request.targets(ADMIN_LOGIN_PATH)
}

fn log_refresh_failure(error: &ClientError) {
    tracing::warn!(error = %error, "token refresh failed, signing out");
}

/// Settles waiters when the leading refresh finishes or is dropped mid-way.
struct InFlight<'a> {
    gate: &'a RefreshGate,
    succeeded: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let previous = std::mem::replace(&mut *self.gate.lock(), GateState::Idle);
        if let GateState::Refreshing(waiters) = previous {
            for tx in waiters {
                let _ = tx.send(self.succeeded);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use medico_core::{SessionId, UserId};

    use super::*;
    use crate::session::Session;
    use crate::storage::MemoryStore;

    const BASE: &str = "http://api.test";

    /// Accepts exactly one token; `/auth/refresh` rotates it.
    struct Backend {
        valid: Mutex<String>,
        next: Option<String>,
        reject_all: AtomicBool,
        refresh_calls: AtomicUsize,
        seen: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl Transport for Backend {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
            self.seen.lock().unwrap().push(request.clone());
            let bearer = request
                .bearer
                .as_ref()
                .map(|t| t.expose_secret().to_string());

            if request.targets(REFRESH_PATH) {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Ok(match &self.next {
                    Some(token) => {
                        token.clone_into(&mut self.valid.lock().unwrap());
                        ApiResponse::new(200, format!(r#"{{"access_token":"{token}"}}"#))
                    }
                    None => ApiResponse::new(401, r#"{"detail":"refresh token expired"}"#),
                });
            }

            tokio::task::yield_now().await;
            let valid = self.valid.lock().unwrap().clone();
            if !self.reject_all.load(Ordering::SeqCst) && bearer.as_deref() == Some(valid.as_str()) {
                Ok(ApiResponse::new(200, "{}"))
            } else {
                Ok(ApiResponse::new(401, r#"{"detail":"token expired"}"#))
            }
        }
    }

    fn setup(token: Option<&str>, next: Option<&str>) -> (RefreshGate, Arc<Backend>, AuthState) {
        let backend = Arc::new(Backend {
            valid: Mutex::new(String::new()),
            next: next.map(String::from),
            reject_all: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        });
        let auth = AuthState::restore(Arc::new(MemoryStore::new()));
        if let Some(token) = token {
            auth.login(
                Session::authenticated(UserId::new(7), SessionId::new("s-7"), []),
                SecretString::from(token),
            );
        }
        let config = Arc::new(ClientConfig::new(BASE).unwrap());
        let gate = RefreshGate::new(config, auth.clone(), backend.clone());
        (gate, backend, auth)
    }

    fn get(path: &str) -> ApiRequest {
        ApiRequest::new(Method::GET, format!("{BASE}{path}"))
    }

    /// Holds the first request until released, then answers 401; later
    /// requests get a 200.
    struct Held {
        release: tokio::sync::Notify,
        bearers: Mutex<Vec<Option<String>>>,
        refresh_calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for Held {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
            if request.targets(REFRESH_PATH) {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                return Ok(ApiResponse::new(200, r#"{"access_token":"rotated"}"#));
            }
            let first = {
                let mut bearers = self.bearers.lock().unwrap();
                bearers.push(request.bearer.as_ref().map(|t| t.expose_secret().to_string()));
                bearers.len() == 1
            };
            if first {
                self.release.notified().await;
                return Ok(ApiResponse::new(401, r#"{"detail":"token expired"}"#));
            }
            Ok(ApiResponse::new(200, "{}"))
        }
    }

    #[tokio::test]
    async fn test_401_after_user_switch_is_not_replayed() {
        let held = Arc::new(Held {
            release: tokio::sync::Notify::new(),
            bearers: Mutex::new(Vec::new()),
            refresh_calls: AtomicUsize::new(0),
        });
        let auth = AuthState::restore(Arc::new(MemoryStore::new()));
        auth.login(
            Session::authenticated(UserId::new(1), SessionId::new("s-1"), []),
            SecretString::from("token-A"),
        );
        let config = Arc::new(ClientConfig::new(BASE).unwrap());
        let gate = RefreshGate::new(config, auth.clone(), held.clone());

        let request = ApiRequest::new(Method::DELETE, format!("{BASE}/cart/clear"));
        let (response, ()) = tokio::join!(gate.execute(request), async {
            while held.bearers.lock().unwrap().is_empty() {
                tokio::task::yield_now().await;
            }
            auth.logout();
            auth.login(
                Session::authenticated(UserId::new(2), SessionId::new("s-2"), []),
                SecretString::from("token-B"),
            );
            held.release.notify_one();
        });

        assert_eq!(response.unwrap().status, 401);
        assert_eq!(*held.bearers.lock().unwrap(), [Some("token-A".to_string())]);
        assert_eq!(held.refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(auth.access_token().unwrap().expose_secret(), "token-B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_401s_share_one_refresh() {
        let (gate, backend, auth) = setup(Some("old"), Some("new"));

        let (a, b, c) = tokio::join!(
            gate.execute(get("/cart/")),
            gate.execute(get("/profile/customer-profile")),
            gate.execute(get("/profile/addresses")),
        );

        assert_eq!(a.unwrap().status, 200);
        assert_eq!(b.unwrap().status, 200);
        assert_eq!(c.unwrap().status, 200);
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(auth.access_token().unwrap().expose_secret(), "new");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_signs_out_and_returns_original_401() {
        let (gate, backend, auth) = setup(Some("old"), None);

        let (a, b) = tokio::join!(gate.execute(get("/cart/")), gate.execute(get("/cart/")));

        assert_eq!(a.unwrap().status, 401);
        assert_eq!(b.unwrap().status, 401);
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
        assert!(!auth.is_authenticated());
        assert!(auth.access_token().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_happens_once() {
        let (gate, backend, _auth) = setup(Some("old"), Some("new"));
        backend.reject_all.store(true, Ordering::SeqCst);

        let response = gate.execute(get("/cart/")).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
        // original, refresh, replay
        assert_eq!(backend.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_token_means_no_refresh() {
        let (gate, backend, _auth) = setup(None, Some("new"));

        let response = gate.execute(get("/cart/")).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admin_login_401_is_not_refreshed() {
        let (gate, backend, auth) = setup(Some("old"), Some("new"));

        let request = ApiRequest::new(Method::POST, format!("{BASE}{ADMIN_LOGIN_PATH}"));
        let response = gate.execute(request).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
        assert!(auth.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_urls_get_no_credentials() {
        let (gate, backend, _auth) = setup(Some("old"), Some("new"));

        let response = gate
            .execute(ApiRequest::new(Method::GET, "https://cdn.example.com/logo.png"))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        let seen = backend.seen.lock().unwrap();
        assert!(seen[0].bearer.is_none());
        assert!(!seen[0].with_credentials);
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_calls_carry_token_and_credentials() {
        let (gate, backend, _auth) = setup(Some("old"), Some("new"));
        "old".clone_into(&mut backend.valid.lock().unwrap());

        let response = gate.execute(get("/cart/")).await.unwrap();

        assert_eq!(response.status, 200);
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].bearer.as_ref().unwrap().expose_secret(), "old");
        assert!(seen[0].with_credentials);
    }
}
