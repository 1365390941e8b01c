//! Authentication state holder.
//!
//! Holds the current session and the access token. The session record is
//! persisted under [`keys::USER`](crate::storage::keys::USER) so it survives
//! restarts; the access token is kept in memory only and never written out.
//!
//! Changes are published on a `tokio::sync::watch` channel; the cart service
//! subscribes to it to run reconciliation on login and logout.
//!
//! Every login and logout starts a new *generation*. A token refresh keeps the
//! generation, so a request can tell a rotated token from a different user.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use medico_core::{SessionId, UserId, UserRole};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::storage::{KeyValueStore, keys, load_json, save_json};

/// Persisted identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Whether the backend accepted the login.
    pub authenticated: bool,
    /// Role tags granted to the user.
    #[serde(default)]
    pub roles: BTreeSet<UserRole>,
    /// Backend user ID.
    pub user_id: UserId,
    /// Backend session ID.
    pub session_id: SessionId,
}

impl Session {
    /// Build an authenticated session with the given roles.
    #[must_use]
    pub fn authenticated(
        user_id: UserId,
        session_id: SessionId,
        roles: impl IntoIterator<Item = UserRole>,
    ) -> Self {
        Self {
            authenticated: true,
            roles: roles.into_iter().collect(),
            user_id,
            session_id,
        }
    }

    /// Whether this session belongs to an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.authenticated && self.roles.contains(&UserRole::Admin)
    }
}

/// The access token together with the generation it was issued in.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub generation: u64,
    pub token: Option<SecretString>,
}

/// Shared authentication state.
///
/// Cheaply cloneable via `Arc`; every clone observes the same session.
#[derive(Clone)]
pub struct AuthState {
    inner: Arc<AuthStateInner>,
}

struct AuthStateInner {
    store: Arc<dyn KeyValueStore>,
    credentials: Mutex<Credentials>,
    session: watch::Sender<Option<Session>>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("session", &*self.inner.session.borrow())
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl AuthState {
    /// Create the state, restoring any session persisted in `store`.
    #[must_use]
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let session = match load_json::<Session>(store.as_ref(), keys::USER) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted session");
                None
            }
        };
        let (sender, _) = watch::channel(session);

        Self {
            inner: Arc::new(AuthStateInner {
                store,
                credentials: Mutex::new(Credentials::default()),
                session: sender,
            }),
        }
    }

    /// Record a successful login.
    ///
    /// An authenticated session without roles is granted `customer`.
    pub fn login(&self, mut session: Session, access_token: SecretString) {
        if session.authenticated && session.roles.is_empty() {
            session.roles.insert(UserRole::Customer);
        }

        if let Err(e) = save_json(self.inner.store.as_ref(), keys::USER, &session) {
            tracing::warn!(error = %e, "failed to persist session");
        }
        self.start_generation(Some(access_token));
        set_sentry_user(session.user_id);

        tracing::info!(
            user_id = %session.user_id,
            roles = ?session.roles,
            "signed in"
        );
        self.inner.session.send_replace(Some(session));
    }

    /// Forget the session and the token.
    pub fn logout(&self) {
        if let Err(e) = self.inner.store.remove(keys::USER) {
            tracing::warn!(error = %e, "failed to remove persisted session");
        }
        self.start_generation(None);
        clear_sentry_user();

        let previous = self.inner.session.send_replace(None);
        if let Some(session) = previous {
            tracing::info!(user_id = %session.user_id, "signed out");
        }
    }

    /// Sign out, but only if `generation` is still the current one.
    ///
    /// Returns whether the session was cleared.
    pub fn expire(&self, generation: u64) -> bool {
        if self.credentials().generation != generation {
            return false;
        }
        self.logout();
        true
    }

    /// Install a refreshed token for `generation`.
    ///
    /// Returns `false` (and changes nothing) if a login or logout happened in
    /// the meantime.
    pub fn rotate_access_token(&self, generation: u64, token: SecretString) -> bool {
        let mut credentials = self.lock_credentials();
        if credentials.generation != generation {
            return false;
        }
        credentials.token = Some(token);
        true
    }

    /// Current access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.lock_credentials().token.clone()
    }

    /// Current token and generation, read together.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        self.lock_credentials().clone()
    }

    /// The access token, if `generation` is still current.
    #[must_use]
    pub fn token_for(&self, generation: u64) -> Option<SecretString> {
        let credentials = self.lock_credentials();
        if credentials.generation == generation {
            credentials.token.clone()
        } else {
            None
        }
    }

    fn start_generation(&self, token: Option<SecretString>) {
        let mut credentials = self.lock_credentials();
        credentials.generation += 1;
        credentials.token = token;
    }

    fn lock_credentials(&self) -> MutexGuard<'_, Credentials> {
        self.inner
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.inner.session.borrow().clone()
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.session.subscribe()
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .session
            .borrow()
            .as_ref()
            .is_some_and(|s| s.authenticated)
    }

    /// Roles of the signed-in user (empty when signed out).
    #[must_use]
    pub fn roles(&self) -> Vec<UserRole> {
        self.inner
            .session
            .borrow()
            .as_ref()
            .map(|s| s.roles.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether the signed-in user holds `role`.
    #[must_use]
    pub fn has_role(&self, role: UserRole) -> bool {
        self.with_authenticated(|s| s.roles.contains(&role))
    }

    /// Whether the signed-in user holds at least one of `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        self.with_authenticated(|s| roles.iter().any(|r| s.roles.contains(r)))
    }

    /// Whether the signed-in user holds every one of `roles`.
    #[must_use]
    pub fn has_all_roles(&self, roles: &[UserRole]) -> bool {
        self.with_authenticated(|s| roles.iter().all(|r| s.roles.contains(r)))
    }

    /// Whether the signed-in user is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    fn with_authenticated(&self, check: impl FnOnce(&Session) -> bool) -> bool {
        self.inner
            .session
            .borrow()
            .as_ref()
            .filter(|s| s.authenticated)
            .is_some_and(check)
    }
}
