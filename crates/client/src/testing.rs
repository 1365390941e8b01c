//! Scripted in-process backend for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Method;
use secrecy::SecretString;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{ApiRequest, ApiResponse, Pipeline, Transport};
use crate::notify::Toasts;
use crate::session::{AuthState, Session};
use crate::storage::MemoryStore;

pub const BASE: &str = "http://api.test";

/// Answers queued responses per `(method, path)`; the last one repeats.
/// Unknown routes answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<ApiResponse>>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(ApiResponse::new(status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self, method: &Method, path: &str) -> usize {
        let url = format!("{BASE}{path}");
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.method == method && r.url == url)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.seen.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;

        let path = request.url.strip_prefix(BASE).unwrap_or(&request.url).to_string();
        let mut routes = self.routes.lock().unwrap();
        let response = match routes.get_mut(&(request.method.clone(), path)) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => ApiResponse::new(404, r#"{"detail":"Not Found"}"#),
        };
        drop(routes);
        Ok(response)
    }
}

/// Everything a service under test needs, wired to a scripted backend.
pub struct Harness {
    pub config: Arc<ClientConfig>,
    pub store: Arc<MemoryStore>,
    pub auth: AuthState,
    pub toasts: Toasts,
    pub pipeline: Arc<Pipeline>,
    pub backend: Arc<ScriptedTransport>,
}

impl Harness {
    pub fn new() -> Self {
        let config = Arc::new(ClientConfig::new(BASE).unwrap());
        let store = Arc::new(MemoryStore::new());
        let auth = AuthState::restore(store.clone());
        let toasts = Toasts::new(config.toast_duration);
        let backend = ScriptedTransport::new();
        let pipeline = Arc::new(Pipeline::new(
            config.clone(),
            auth.clone(),
            backend.clone(),
            toasts.clone(),
        ));

        Self {
            config,
            store,
            auth,
            toasts,
            pipeline,
            backend,
        }
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(
            self.config.clone(),
            self.pipeline.clone(),
            self.auth.clone(),
            self.toasts.clone(),
        )
    }

    pub fn sign_in(&self, session: Session) {
        self.auth.login(session, SecretString::from("test-token"));
    }
}
