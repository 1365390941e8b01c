//! Medico Client - SDK for the medico-store REST backend.
//!
//! The pieces of the store front end that hold state and control flow:
//!
//! - [`session`] - who is signed in, with the access token kept in memory
//! - [`http`] - request pipeline: logging, error toasts, token refresh gate
//! - [`api`] - typed wrappers over the auth, cart and profile endpoints
//! - [`cart`] - the cart, including guest-to-customer reconciliation
//! - [`symptom`] - keyword-based medicine suggestions
//! - [`guard`] - role checks and the route table
//! - [`notify`] - toasts and confirmation dialogs
//! - [`storage`] - persisted JSON records
//!
//! [`MedicoClient`] wires all of them together.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod notify;
pub mod session;
pub mod storage;
pub mod symptom;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tokio::task::JoinHandle;

pub use api::ApiClient;
pub use cart::{Cart, CartLine, CartMode, CartService};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use session::{AuthState, Session};

use crate::guard::Navigation;
use crate::http::{Pipeline, ReqwestTransport, Transport};
use crate::notify::{ConfirmDialogs, Toasts};
use crate::storage::KeyValueStore;
use crate::symptom::SymptomChat;

/// Fully wired client.
///
/// Owns the background task that keeps the cart in step with sign-in and
/// sign-out; the task stops when the client is dropped.
pub struct MedicoClient {
    config: Arc<ClientConfig>,
    auth: AuthState,
    toasts: Toasts,
    dialogs: ConfirmDialogs,
    api: ApiClient,
    cart: CartService,
    listener: JoinHandle<()>,
}

impl MedicoClient {
    /// Connect to the configured backend over HTTP.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub fn connect(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let transport = ReqwestTransport::new(config.http_timeout)?;
        Ok(Self::with_transport(config, store, Arc::new(transport)))
    }

    /// Build the client over any transport.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn with_transport(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let config = Arc::new(config);
        let auth = AuthState::restore(store.clone());
        let toasts = Toasts::new(config.toast_duration);
        let pipeline = Arc::new(Pipeline::new(
            config.clone(),
            auth.clone(),
            transport,
            toasts.clone(),
        ));
        let api = ApiClient::new(config.clone(), pipeline, auth.clone(), toasts.clone());
        let cart = CartService::new(api.clone(), store);
        let listener = cart.spawn_auth_listener();

        Self {
            config,
            auth,
            toasts,
            dialogs: ConfirmDialogs::new(),
            api,
            cart,
            listener,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthState {
        &self.auth
    }

    #[must_use]
    pub const fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    #[must_use]
    pub const fn dialogs(&self) -> &ConfirmDialogs {
        &self.dialogs
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub const fn cart(&self) -> &CartService {
        &self.cart
    }

    /// Start a symptom-checker conversation.
    #[must_use]
    pub fn symptom_chat(&self) -> SymptomChat {
        SymptomChat::open(self.cart.clone(), self.config.symptom_delay)
    }

    /// Resolve `path` for the current user.
    #[must_use]
    pub fn navigate(&self, path: &str) -> Navigation {
        guard::navigate(path, &self.auth)
    }
}

impl std::fmt::Debug for MedicoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MedicoClient")
            .field("api_base_url", &self.config.api_base_url)
            .field("auth", &self.auth)
            .field("cart_mode", &self.cart.mode())
            .finish_non_exhaustive()
    }
}

impl Drop for MedicoClient {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
