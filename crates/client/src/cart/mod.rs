//! Cart service: the single in-memory cart and its reconciliation with the
//! backend across sign-in and sign-out.
//!
//! Which copy of the cart is authoritative depends on who is signed in:
//!
//! | mode | storage | mutations |
//! |---|---|---|
//! | guest | `cart_guest` | in memory, persisted immediately |
//! | customer | server, mirrored to `cart_local_customer_{id}` | optimistic, rolled back on failure |
//! | admin | none (`cart_admin_disabled` marker) | rejected |
//!
//! Signing in as a customer merges the guest cart into the server cart.
//! Signing out drops the in-memory cart and reloads the guest cart.

mod model;

pub use model::{Cart, CartLine};

use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures::future::join_all;
use medico_core::{Price, ProductId, UserId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::api::{ApiClient, ServerCart};
use crate::catalog::Product;
use crate::error::{ClientError, Result, add_breadcrumb};
use crate::session::Session;
use crate::storage::{KeyValueStore, keys, load_json, save_json};

/// Who the cart currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartMode {
    Guest,
    Customer(UserId),
    AdminDisabled,
}

impl CartMode {
    fn for_session(session: Option<&Session>) -> Self {
        match session {
            Some(s) if s.authenticated && s.is_admin() => Self::AdminDisabled,
            Some(s) if s.authenticated => Self::Customer(s.user_id),
            _ => Self::Guest,
        }
    }
}

/// The cart shared by every view of the app.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct CartService {
    inner: Arc<CartServiceInner>,
}

struct CartServiceInner {
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
    mode: Mutex<CartMode>,
    /// Serializes sign-in/sign-out handling.
    transition: tokio::sync::Mutex<()>,
    cart: watch::Sender<Cart>,
}

impl CartService {
    /// Create the service for whoever is signed in right now.
    ///
    /// A restored customer session starts from that customer's local mirror;
    /// call [`CartService::sync`] to pull the server copy.
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn KeyValueStore>) -> Self {
        let mode = CartMode::for_session(api.auth().session().as_ref());
        let initial = match mode {
            CartMode::Guest => load_cart(store.as_ref(), keys::CART_GUEST),
            CartMode::Customer(user_id) => load_cart(store.as_ref(), &keys::cart_customer(user_id)),
            CartMode::AdminDisabled => Cart::new(),
        };
        let (cart, _) = watch::channel(initial);

        Self {
            inner: Arc::new(CartServiceInner {
                api,
                store,
                mode: Mutex::new(mode),
                transition: tokio::sync::Mutex::new(()),
                cart,
            }),
        }
    }

    /// Follow sign-in/sign-out changes in the background.
    ///
    /// The task ends once the service has been dropped and the next auth
    /// change arrives, or when the auth state itself goes away.
    pub fn spawn_auth_listener(&self) -> JoinHandle<()> {
        let weak: Weak<CartServiceInner> = Arc::downgrade(&self.inner);
        let mut rx = self.inner.api.auth().subscribe();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let session = rx.borrow_and_update().clone();
                let Some(inner) = weak.upgrade() else { break };
                Self { inner }.on_auth_change(session.as_ref()).await;
            }
        })
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> CartMode {
        *self.inner.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.inner.cart.borrow().clone()
    }

    /// Total number of units.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.inner.cart.borrow().count()
    }

    /// Sum of `price × quantity`.
    #[must_use]
    pub fn total(&self) -> Price {
        self.inner.cart.borrow().total()
    }

    /// Subscribe to cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.cart.subscribe()
    }

    // =========================================================================
    // Auth transitions
    // =========================================================================

    /// React to a sign-in or sign-out.
    ///
    /// Transitions run one at a time; repeated notifications for the same
    /// identity are ignored.
    #[instrument(skip_all)]
    pub async fn on_auth_change(&self, session: Option<&Session>) {
        let _transition = self.inner.transition.lock().await;
        let next = CartMode::for_session(session);
        let previous = std::mem::replace(&mut *self.lock_mode(), next);
        if previous == next {
            return;
        }
        tracing::debug!(?previous, ?next, "cart mode changed");

        if previous == CartMode::AdminDisabled {
            self.remove_key(keys::CART_ADMIN_DISABLED);
        }

        match next {
            CartMode::Guest => {
                let guest = load_cart(self.inner.store.as_ref(), keys::CART_GUEST);
                self.inner.cart.send_replace(guest);
            }
            CartMode::AdminDisabled => {
                self.inner.cart.send_replace(Cart::new());
                if let Err(e) = save_json(self.inner.store.as_ref(), keys::CART_ADMIN_DISABLED, &true) {
                    tracing::warn!(error = %e, "failed to store admin cart marker");
                }
            }
            CartMode::Customer(user_id) => self.reconcile(user_id).await,
        }
    }

    /// Bring the cart in line with whoever is signed in now.
    ///
    /// Waits for a transition already running in the background listener.
    pub async fn catch_up(&self) {
        let session = self.inner.api.auth().session();
        self.on_auth_change(session.as_ref()).await;
    }

    /// Merge the guest cart into the server cart and adopt the result.
    async fn reconcile(&self, user_id: UserId) {
        let api = &self.inner.api;
        let guest = load_cart(self.inner.store.as_ref(), keys::CART_GUEST);

        let server = match api.get_cart().await {
            Ok(server) => server,
            Err(e) => {
                // Guest lines stay in storage for the next attempt.
                tracing::warn!(error = %e, "could not fetch server cart, using local copy");
                let mirror = load_cart(self.inner.store.as_ref(), &keys::cart_customer(user_id));
                self.adopt_if_current(user_id, mirror);
                return;
            }
        };

        if guest.is_empty() {
            self.adopt_if_current(user_id, Cart::from_server(&server));
            return;
        }

        let server_ref = &server;
        let merges = guest.lines().iter().map(|line| async move {
            let id = line.product_id;
            let result = match server_ref.quantity_of(id) {
                Some(existing) => {
                    api.update_item(id, existing.saturating_add(line.quantity))
                        .await
                }
                None => api.add_item(id, line.quantity).await,
            };
            (id, result)
        });
        for (product_id, result) in join_all(merges).await {
            if let Err(e) = result {
                tracing::warn!(%product_id, error = %e, "failed to merge guest cart line");
            }
        }

        self.remove_key(keys::CART_GUEST);
        tracing::info!(%user_id, lines = guest.lines().len(), "merged guest cart");
        add_breadcrumb("cart", "Merged guest cart", None);

        let merged = match api.get_cart().await {
            Ok(server) => Cart::from_server(&server),
            Err(e) => {
                tracing::warn!(error = %e, "could not re-fetch cart after merge, using local copy");
                load_cart(self.inner.store.as_ref(), &keys::cart_customer(user_id))
            }
        };
        self.adopt_if_current(user_id, merged);
    }

    /// Pull the server cart (customers only).
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be fetched.
    pub async fn sync(&self) -> Result<Cart> {
        let CartMode::Customer(user_id) = self.mode() else {
            return Ok(self.cart());
        };
        let server: ServerCart = self.inner.api.get_cart().await?;
        let cart = Cart::from_server(&server);
        self.adopt_if_current(user_id, cart.clone());
        Ok(cart)
    }

    fn adopt_if_current(&self, user_id: UserId, cart: Cart) {
        if self.mode() != CartMode::Customer(user_id) {
            tracing::debug!(%user_id, "identity changed during cart fetch, discarding result");
            return;
        }
        self.save_mirror(user_id, &cart);
        self.inner.cart.send_replace(cart);
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AdminCartDisabled` for administrators,
    /// `ClientError::Validation` for a zero quantity, or the backend error
    /// (after rolling back) for customers.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &Product, quantity: u32) -> Result<()> {
        let mode = self.writable_mode()?;
        if quantity == 0 {
            return Err(ClientError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let template = CartLine::new(product, 0);
        let mut had_line = false;
        let mut updated = 0;
        self.inner.cart.send_modify(|cart| {
            had_line = cart.line(product.id).is_some();
            updated = cart.add(product, quantity);
        });
        add_breadcrumb("cart", "Added to cart", Some(&[("product", product.name.as_str())]));

        let result = match mode {
            CartMode::Customer(_) if had_line => {
                self.inner.api.update_item(product.id, updated).await
            }
            CartMode::Customer(_) => self.inner.api.add_item(product.id, quantity).await,
            _ => Ok(()),
        };
        self.settle(mode, result, &template, -i64::from(quantity))?;

        let toasts = self.inner.api.toasts();
        toasts.show(format!("{} added to cart", product.name));
        Ok(())
    }

    /// Add one more unit of a product already in the cart.
    ///
    /// # Errors
    ///
    /// See [`CartService::add`].
    pub async fn increase(&self, product_id: ProductId) -> Result<()> {
        self.step(product_id, 1).await
    }

    /// Take away one unit; the line disappears at zero.
    ///
    /// # Errors
    ///
    /// See [`CartService::add`].
    pub async fn decrease(&self, product_id: ProductId) -> Result<()> {
        self.step(product_id, -1).await
    }

    #[instrument(skip(self))]
    async fn step(&self, product_id: ProductId, delta: i64) -> Result<()> {
        let mode = self.writable_mode()?;

        let mut template = None;
        let mut updated = 0;
        self.inner.cart.send_if_modified(|cart| {
            let Some(line) = cart.line(product_id).cloned() else {
                return false;
            };
            updated = cart.apply_delta(&line, delta);
            template = Some(line);
            true
        });
        // Absent line: nothing to change, nothing to send.
        let Some(template) = template else {
            return Ok(());
        };

        let result = match mode {
            CartMode::Customer(_) if updated == 0 => self.inner.api.remove_item(product_id).await,
            CartMode::Customer(_) => self.inner.api.update_item(product_id, updated).await,
            _ => Ok(()),
        };
        self.settle(mode, result, &template, -delta)
    }

    /// Drop a product from the cart.
    ///
    /// # Errors
    ///
    /// See [`CartService::add`].
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: ProductId) -> Result<()> {
        let mode = self.writable_mode()?;

        let mut removed = None;
        self.inner.cart.send_if_modified(|cart| {
            removed = cart.remove(product_id);
            removed.is_some()
        });
        let Some(line) = removed else {
            return Ok(());
        };

        let result = match mode {
            CartMode::Customer(_) => self.inner.api.remove_item(product_id).await,
            _ => Ok(()),
        };
        self.settle(mode, result, &line, i64::from(line.quantity))
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// See [`CartService::add`].
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let mode = self.writable_mode()?;

        let mut removed = Vec::new();
        self.inner.cart.send_if_modified(|cart| {
            removed = cart.clear();
            !removed.is_empty()
        });

        let result = match mode {
            CartMode::Customer(_) => self.inner.api.clear_cart().await,
            _ => Ok(()),
        };
        if let Err(e) = result {
            self.inner.cart.send_modify(|cart| {
                for line in &removed {
                    cart.apply_delta(line, i64::from(line.quantity));
                }
            });
            return Err(e);
        }
        self.persist(mode);
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// The current mode, or a rejection (with toast) for administrators.
    fn writable_mode(&self) -> Result<CartMode> {
        let mode = self.mode();
        if mode == CartMode::AdminDisabled {
            let error = ClientError::AdminCartDisabled;
            let toasts = self.inner.api.toasts();
            toasts.error(error.to_string(), toasts.default_duration());
            return Err(error);
        }
        Ok(mode)
    }

    /// Persist after success, or undo `template`'s change by `undo` on failure.
    fn settle(&self, mode: CartMode, result: Result<()>, template: &CartLine, undo: i64) -> Result<()> {
        if let Err(e) = result {
            tracing::warn!(product_id = %template.product_id, error = %e, "cart update failed, rolling back");
            self.inner.cart.send_modify(|cart| {
                cart.apply_delta(template, undo);
            });
            return Err(e);
        }
        self.persist(mode);
        Ok(())
    }

    fn persist(&self, mode: CartMode) {
        // A sign-out may have happened while the request was in flight.
        if self.mode() != mode {
            return;
        }
        let cart = self.cart();
        match mode {
            CartMode::Guest => {
                if let Err(e) = save_json(self.inner.store.as_ref(), keys::CART_GUEST, &cart) {
                    tracing::warn!(error = %e, "failed to persist guest cart");
                }
            }
            CartMode::Customer(user_id) => self.save_mirror(user_id, &cart),
            CartMode::AdminDisabled => {}
        }
    }

    fn save_mirror(&self, user_id: UserId, cart: &Cart) {
        let key = keys::cart_customer(user_id);
        if let Err(e) = save_json(self.inner.store.as_ref(), &key, cart) {
            tracing::warn!(error = %e, "failed to persist customer cart mirror");
        }
    }

    fn remove_key(&self, key: &str) {
        if let Err(e) = self.inner.store.remove(key) {
            tracing::warn!(key, error = %e, "failed to remove stored cart");
        }
    }

    fn lock_mode(&self) -> std::sync::MutexGuard<'_, CartMode> {
        self.inner.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService")
            .field("mode", &self.mode())
            .field("cart", &*self.inner.cart.borrow())
            .finish_non_exhaustive()
    }
}

fn load_cart(store: &dyn KeyValueStore, key: &str) -> Cart {
    match load_json::<Cart>(store, key) {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read stored cart");
            Cart::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use medico_core::{SessionId, UserRole};
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::catalog;
    use crate::http::RequestBody;
    use crate::testing::Harness;

    fn product(id: i32) -> Product {
        catalog::find(ProductId::new(id)).unwrap()
    }

    fn customer() -> Session {
        Session::authenticated(UserId::new(7), SessionId::new("s-7"), [UserRole::Customer])
    }

    fn admin() -> Session {
        Session::authenticated(UserId::new(1), SessionId::new("s-1"), [UserRole::Admin])
    }

    fn service(h: &Harness) -> CartService {
        CartService::new(h.api(), h.store.clone())
    }

    #[tokio::test]
    async fn test_guest_mutations_persist_and_total() {
        let h = Harness::new();
        let cart = service(&h);

        cart.add(&product(1), 2).await.unwrap();
        cart.add(&product(5), 1).await.unwrap();
        cart.decrease(ProductId::new(1)).await.unwrap();
        cart.increase(ProductId::new(5)).await.unwrap();

        assert_eq!(cart.count(), 3);
        assert_eq!(cart.total(), Price::from_paise(590 + 4500 * 2));

        let stored: Cart = load_json(h.store.as_ref(), keys::CART_GUEST).unwrap().unwrap();
        assert_eq!(stored, cart.cart());
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_guest_cart_survives_restart() {
        let h = Harness::new();
        service(&h).add(&product(7), 1).await.unwrap();

        let restarted = service(&h);
        assert_eq!(restarted.cart().quantity_of(ProductId::new(7)), 1);
    }

    #[tokio::test]
    async fn test_login_with_empty_server_cart_pushes_guest_lines() {
        let h = Harness::new();
        let cart = service(&h);
        cart.add(&product(5), 2).await.unwrap();

        h.backend.respond(Method::GET, "/cart/", 200, json!({"items": []}));
        h.backend
            .respond(Method::GET, "/cart/", 200, json!({"items": [{"product_id": 5, "quantity": 2}]}));
        h.backend.respond(Method::POST, "/cart/items/", 201, json!({}));

        h.sign_in(customer());
        cart.on_auth_change(Some(&customer())).await;

        let lines: Vec<_> = cart.cart().lines().iter().map(|l| (l.product_id.as_i32(), l.quantity)).collect();
        assert_eq!(lines, [(5, 2)]);
        assert!(h.store.get(keys::CART_GUEST).unwrap().is_none());
        assert_eq!(h.backend.count(&Method::POST, "/cart/items/"), 1);
        assert_eq!(cart.mode(), CartMode::Customer(UserId::new(7)));
    }

    #[tokio::test]
    async fn test_login_merges_overlapping_product() {
        let h = Harness::new();
        let cart = service(&h);
        cart.add(&product(5), 2).await.unwrap();

        h.backend
            .respond(Method::GET, "/cart/", 200, json!({"items": [{"product_id": 5, "quantity": 3}]}));
        h.backend
            .respond(Method::GET, "/cart/", 200, json!({"items": [{"product_id": 5, "quantity": 5}]}));
        h.backend.respond(Method::PUT, "/cart/items/5", 200, json!({}));

        h.sign_in(customer());
        cart.on_auth_change(Some(&customer())).await;

        let put = h
            .backend
            .requests()
            .into_iter()
            .find(|r| r.method == Method::PUT)
            .unwrap();
        assert_eq!(put.body, RequestBody::Json(json!({"quantity": 5})));
        assert_eq!(cart.cart().quantity_of(ProductId::new(5)), 5);
        assert!(h.store.get(keys::CART_GUEST).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_quantity_saturates() {
        let h = Harness::new();
        let cart = service(&h);
        cart.add(&product(5), 1).await.unwrap();

        let full = json!({"items": [{"product_id": 5, "quantity": u32::MAX}]});
        h.backend.respond(Method::GET, "/cart/", 200, full);
        h.backend.respond(Method::PUT, "/cart/items/5", 200, json!({}));

        h.sign_in(customer());
        cart.on_auth_change(Some(&customer())).await;

        let put = h
            .backend
            .requests()
            .into_iter()
            .find(|r| r.method == Method::PUT)
            .unwrap();
        assert_eq!(put.body, RequestBody::Json(json!({"quantity": u32::MAX})));
        assert_eq!(cart.cart().quantity_of(ProductId::new(5)), u32::MAX);
        assert!(h.store.get(keys::CART_GUEST).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_refetch_adopts_mirror_not_guest_echo() {
        let h = Harness::new();
        let cart = service(&h);
        cart.add(&product(5), 2).await.unwrap();

        let mut mirror = Cart::new();
        mirror.add(&product(3), 1);
        save_json(h.store.as_ref(), &keys::cart_customer(UserId::new(7)), &mirror).unwrap();

        h.backend
            .respond(Method::GET, "/cart/", 200, json!({"items": [{"product_id": 3, "quantity": 1}]}));
        h.backend.respond(Method::GET, "/cart/", 503, json!({"detail": "down"}));
        h.backend.respond(Method::POST, "/cart/items/", 201, json!({}));

        h.sign_in(customer());
        cart.on_auth_change(Some(&customer())).await;

        assert_eq!(h.backend.count(&Method::POST, "/cart/items/"), 1);
        assert_eq!(cart.cart(), mirror);
        assert_eq!(cart.cart().quantity_of(ProductId::new(5)), 0);
        assert!(h.store.get(keys::CART_GUEST).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_initial_fetch_keeps_guest_storage() {
        let h = Harness::new();
        let cart = service(&h);
        cart.add(&product(5), 2).await.unwrap();

        h.backend.respond(Method::GET, "/cart/", 503, json!({"detail": "down"}));
        h.sign_in(customer());
        cart.on_auth_change(Some(&customer())).await;

        assert!(h.store.get(keys::CART_GUEST).unwrap().is_some());
        assert!(cart.cart().is_empty());
    }

    #[tokio::test]
    async fn test_two_rapid_decreases_issue_one_delete() {
        let h = Harness::new();
        h.sign_in(customer());
        h.backend
            .respond(Method::GET, "/cart/", 200, json!({"items": [{"product_id": 3, "quantity": 1}]}));
        h.backend.respond(Method::DELETE, "/cart/items/3", 200, json!({}));
        let cart = service(&h);
        cart.sync().await.unwrap();

        let (a, b) = tokio::join!(
            cart.decrease(ProductId::new(3)),
            cart.decrease(ProductId::new(3))
        );

        a.unwrap();
        b.unwrap();
        assert!(cart.cart().line(ProductId::new(3)).is_none());
        assert_eq!(h.backend.count(&Method::DELETE, "/cart/items/3"), 1);
    }

    #[tokio::test]
    async fn test_failed_customer_update_rolls_back() {
        let h = Harness::new();
        h.sign_in(customer());
        h.backend
            .respond(Method::GET, "/cart/", 200, json!({"items": [{"product_id": 7, "quantity": 2}]}));
        h.backend
            .respond(Method::PUT, "/cart/items/7", 500, json!({"detail": "db error"}));
        let cart = service(&h);
        cart.sync().await.unwrap();

        let err = cart.increase(ProductId::new(7)).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(cart.cart().quantity_of(ProductId::new(7)), 2);

        let err = cart.add(&product(1), 1).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(cart.cart().line(ProductId::new(1)).is_none());
    }

    #[tokio::test]
    async fn test_admin_cart_is_disabled() {
        let h = Harness::new();
        let cart = service(&h);
        cart.add(&product(1), 1).await.unwrap();

        h.sign_in(admin());
        cart.on_auth_change(Some(&admin())).await;

        assert!(cart.cart().is_empty());
        assert!(h.store.get(keys::CART_ADMIN_DISABLED).unwrap().is_some());

        let err = cart.add(&product(1), 1).await.unwrap_err();
        assert!(matches!(err, ClientError::AdminCartDisabled));
        assert!(
            h.toasts
                .active()
                .iter()
                .any(|t| t.message == "Cart is not available for admin accounts")
        );
        assert!(h.backend.requests().is_empty());

        h.auth.logout();
        cart.on_auth_change(None).await;
        assert!(h.store.get(keys::CART_ADMIN_DISABLED).unwrap().is_none());
        assert_eq!(cart.cart().quantity_of(ProductId::new(1)), 1);
    }

    #[tokio::test]
    async fn test_logout_reverts_to_guest_storage() {
        let h = Harness::new();
        let cart = service(&h);

        h.backend
            .respond(Method::GET, "/cart/", 200, json!({"items": [{"product_id": 8, "quantity": 4}]}));
        h.sign_in(customer());
        cart.on_auth_change(Some(&customer())).await;
        assert_eq!(cart.count(), 4);

        h.auth.logout();
        cart.on_auth_change(None).await;

        assert!(cart.cart().is_empty());
        assert_eq!(cart.mode(), CartMode::Guest);
    }

    #[tokio::test]
    async fn test_listener_follows_auth_changes() {
        let h = Harness::new();
        let cart = service(&h);
        let listener = cart.spawn_auth_listener();
        let mut updates = cart.subscribe();

        h.backend
            .respond(Method::GET, "/cart/", 200, json!({"items": [{"product_id": 2, "quantity": 1}]}));
        h.sign_in(customer());

        updates.changed().await.unwrap();
        assert_eq!(cart.cart().quantity_of(ProductId::new(2)), 1);

        listener.abort();
    }

    #[tokio::test]
    async fn test_catch_up_and_listener_reconcile_once() {
        let h = Harness::new();
        let cart = service(&h);
        let listener = cart.spawn_auth_listener();

        h.backend
            .respond(Method::GET, "/cart/", 200, json!({"items": [{"product_id": 4, "quantity": 3}]}));
        h.sign_in(customer());
        cart.catch_up().await;
        tokio::task::yield_now().await;
        cart.catch_up().await;

        assert_eq!(cart.count(), 3);
        assert_eq!(h.backend.count(&Method::GET, "/cart/"), 1);

        listener.abort();
    }
}
