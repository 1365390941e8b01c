//! Integration tests for the Medico Store client.
//!
//! The tests drive a fully wired [`MedicoClient`] against [`FakeBackend`],
//! an in-process stand-in for the REST server that keeps a real cart, issues
//! tokens and can expire them on demand.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p medico-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use medico_client::http::{ApiRequest, ApiResponse, RequestBody, Transport};
use medico_client::storage::MemoryStore;
use medico_client::{ClientConfig, MedicoClient, Result};
use reqwest::Method;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

pub const BASE: &str = "http://backend.test";

pub const CUSTOMER_ID: i32 = 7;
pub const ADMIN_ID: i32 = 1;
pub const VALID_OTP: &str = "123456";
pub const ADMIN_EMAIL: &str = "admin@medico.test";
pub const ADMIN_PASSWORD: &str = "letmein";

#[derive(Debug, Default)]
struct State {
    /// product ID -> quantity, in insertion order by ID
    cart: BTreeMap<i64, u64>,
    token: Option<String>,
    issued: u32,
    refresh_allowed: bool,
    /// Fail every cart write with a 500.
    cart_writes_fail: bool,
    /// Fail writes touching these products with a 500.
    failing_products: BTreeSet<i64>,
    log: Vec<(Method, String)>,
}

/// In-process backend.
#[derive(Debug)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                refresh_allowed: true,
                ..State::default()
            }),
        })
    }

    /// Seed the server-side cart.
    pub fn put_in_cart(&self, product_id: i64, quantity: u64) {
        self.state.lock().unwrap().cart.insert(product_id, quantity);
    }

    /// Server-side cart as `(product_id, quantity)` pairs.
    pub fn cart(&self) -> Vec<(i64, u64)> {
        self.state.lock().unwrap().cart.iter().map(|(k, v)| (*k, *v)).collect()
    }

    /// Invalidate the current access token.
    pub fn expire_token(&self) {
        self.state.lock().unwrap().token = None;
    }

    /// Make `/auth/refresh` fail (as if the refresh cookie expired).
    pub fn reject_refresh(&self) {
        self.state.lock().unwrap().refresh_allowed = false;
    }

    pub fn fail_cart_writes(&self) {
        self.state.lock().unwrap().cart_writes_fail = true;
    }

    /// Fail every add, update or removal of `product_id`.
    pub fn fail_writes_for(&self, product_id: i64) {
        self.state.lock().unwrap().failing_products.insert(product_id);
    }

    /// Number of calls to `method path`.
    pub fn calls(&self, method: &Method, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|(m, p)| m == method && p == path)
            .count()
    }

    fn handle(&self, request: &ApiRequest) -> (u16, Value) {
        let path = request.url.strip_prefix(BASE).unwrap_or(&request.url);
        let path = path.split('?').next().unwrap_or_default().to_string();
        let body = match &request.body {
            RequestBody::Json(value) => value.clone(),
            _ => Value::Null,
        };

        let mut state = self.state.lock().unwrap();
        state.log.push((request.method.clone(), path.clone()));

        let authorized = match (&state.token, &request.bearer) {
            (Some(valid), Some(sent)) => valid == sent.expose_secret(),
            _ => false,
        };

        match (request.method.clone(), path.as_str()) {
            (Method::POST, "/auth/get-otp") => (200, json!({"message": "OTP sent successfully"})),
            (Method::POST, "/auth/login") => {
                if body["otp"] == VALID_OTP && body["phone_number"].as_str().is_some_and(|p| p.starts_with("+91")) {
                    (200, state.issue(CUSTOMER_ID))
                } else {
                    (401, json!({"detail": "Invalid OTP"}))
                }
            }
            (Method::POST, "/auth/admin-login") => {
                if body["email"] == ADMIN_EMAIL && body["password"] == ADMIN_PASSWORD {
                    (200, state.issue(ADMIN_ID))
                } else {
                    (401, json!({"detail": "Invalid credentials"}))
                }
            }
            (Method::POST, "/auth/refresh") => {
                if state.refresh_allowed && request.with_credentials {
                    let token = state.next_token();
                    (200, json!({"access_token": token}))
                } else {
                    (401, json!({"detail": "Refresh token expired"}))
                }
            }
            (Method::POST, "/auth/logout" | "/auth/logout-all") => {
                state.token = None;
                (200, json!({"message": "Logged out"}))
            }
            _ if !authorized => (401, json!({"detail": "Not authenticated"})),
            (Method::GET, "/cart/") => {
                let items: Vec<Value> = state
                    .cart
                    .iter()
                    .map(|(id, qty)| json!({"product_id": id, "quantity": qty}))
                    .collect();
                (200, json!({"items": items}))
            }
            _ if state.cart_writes_fail && path.starts_with("/cart") => {
                (500, json!({"detail": "database unavailable"}))
            }
            (Method::POST, "/cart/items/") => {
                let id = body["product_id"].as_i64().unwrap();
                if state.failing_products.contains(&id) {
                    return (500, json!({"detail": "database unavailable"}));
                }
                let qty = body["quantity"].as_u64().unwrap();
                *state.cart.entry(id).or_default() += qty;
                (201, json!({"message": "Item added"}))
            }
            (Method::DELETE, "/cart/clear") => {
                state.cart.clear();
                (200, json!({"message": "Cart cleared"}))
            }
            (method, item) if item.starts_with("/cart/items/") => {
                let id: i64 = item.trim_start_matches("/cart/items/").parse().unwrap();
                if state.failing_products.contains(&id) {
                    return (500, json!({"detail": "database unavailable"}));
                }
                if !state.cart.contains_key(&id) {
                    return (404, json!({"detail": "Item not in cart"}));
                }
                if method == Method::PUT {
                    state.cart.insert(id, body["quantity"].as_u64().unwrap());
                } else {
                    state.cart.remove(&id);
                }
                (200, json!({"message": "ok"}))
            }
            (Method::GET, "/profile/address-types") => (
                200,
                json!([{"type_id": 1, "name": "Home"}, {"type_id": 2, "name": "Work"}]),
            ),
            _ => (404, json!({"detail": "Not Found"})),
        }
    }
}

impl State {
    fn next_token(&mut self) -> String {
        self.issued += 1;
        let token = format!("token-{}", self.issued);
        self.token = Some(token.clone());
        token
    }

    fn issue(&mut self, user_id: i32) -> Value {
        let token = self.next_token();
        json!({
            "access_token": token,
            "user_id": user_id,
            "session_id": format!("session-{}", self.issued),
        })
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        tokio::task::yield_now().await;
        let (status, body) = self.handle(request);
        Ok(ApiResponse::new(status, body.to_string()))
    }
}

/// A client wired to a fresh backend and an empty store.
pub struct TestContext {
    pub backend: Arc<FakeBackend>,
    pub store: Arc<MemoryStore>,
    pub client: MedicoClient,
}

impl TestContext {
    pub fn new() -> Self {
        let backend = FakeBackend::new();
        let store = Arc::new(MemoryStore::new());
        let client = Self::connect(&backend, &store);
        Self {
            backend,
            store,
            client,
        }
    }

    /// Another client over the same backend and storage, as after a restart.
    pub fn restart(&mut self) {
        self.client = Self::connect(&self.backend, &self.store);
    }

    fn connect(backend: &Arc<FakeBackend>, store: &Arc<MemoryStore>) -> MedicoClient {
        let config = ClientConfig::new(BASE).unwrap();
        MedicoClient::with_transport(config, store.clone(), backend.clone())
    }

    /// Sign in as the test customer and wait for the cart to settle.
    pub async fn login_customer(&self) {
        let phone = medico_core::PhoneNumber::parse("98765 43210").unwrap();
        self.client.api().login(&phone, VALID_OTP).await.unwrap();
        self.client.cart().catch_up().await;
    }

    /// Sign in as the test administrator and wait for the cart to settle.
    pub async fn login_admin(&self) {
        let email = medico_core::Email::parse(ADMIN_EMAIL).unwrap();
        let password = secrecy::SecretString::from(ADMIN_PASSWORD);
        self.client.api().admin_login(&email, &password).await.unwrap();
        self.client.cart().catch_up().await;
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
