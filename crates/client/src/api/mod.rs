//! Typed wrappers over the Medico Store REST endpoints.
//!
//! All calls go through the shared [`Pipeline`], so they get the bearer
//! token, single-flight refresh, request logging, and failure toasts.
//! Address types are cached for 5 minutes.

mod auth;
mod cart;
mod profile;

pub use auth::{LoginResponse, OtpResponse};
pub use cart::{ServerCart, ServerCartItem};
pub use profile::{
    AddAddressResponse, Address, AddressDetails, AddressType, AdminProfile, AdminProfileUpdate,
    CustomerProfile, CustomerProfileUpdate, FamilyMember, FamilyMemberCreate, FamilyMemberUpdate,
    UploadProfilePicResponse,
};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{ApiRequest, ApiResponse, Pipeline};
use crate::notify::Toasts;
use crate::session::AuthState;

/// Client for the Medico Store backend.
///
/// Cheaply cloneable; clones share the pipeline, auth state, and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    config: Arc<ClientConfig>,
    pipeline: Arc<Pipeline>,
    auth: AuthState,
    toasts: Toasts,
    address_types: Cache<String, Vec<AddressType>>,
}

impl ApiClient {
    /// Create a client over an assembled pipeline.
    #[must_use]
    pub fn new(
        config: Arc<ClientConfig>,
        pipeline: Arc<Pipeline>,
        auth: AuthState,
        toasts: Toasts,
    ) -> Self {
        let address_types = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                config,
                pipeline,
                auth,
                toasts,
                address_types,
            }),
        }
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Shared authentication state.
    #[must_use]
    pub fn auth(&self) -> &AuthState {
        &self.inner.auth
    }

    /// Toast queue failures and confirmations are reported to.
    #[must_use]
    pub fn toasts(&self) -> &Toasts {
        &self.inner.toasts
    }

    /// Refresh the access token now, joining any refresh already in flight.
    pub async fn refresh_token(&self) -> bool {
        self.inner.pipeline.gate().refresh_once().await
    }

    fn request(&self, method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(method, self.inner.config.endpoint(path))
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.inner.pipeline.send(request).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::GET, path)).await?.json()
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, path).json(serde_json::to_value(body)?);
        self.send(request).await?.json()
    }

    /// Send and ignore whatever body comes back.
    async fn send_unit(&self, request: ApiRequest) -> Result<()> {
        self.send(request).await.map(drop)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_base_url", &self.inner.config.api_base_url)
            .field("auth", &self.inner.auth)
            .finish_non_exhaustive()
    }
}
