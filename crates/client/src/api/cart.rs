//! Server-side cart endpoints.

use medico_core::{Price, ProductId};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::ApiClient;
use crate::error::Result;

/// One line of the server cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub image: Option<String>,
}

/// The cart as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCart {
    #[serde(default)]
    pub items: Vec<ServerCartItem>,
}

impl ServerCart {
    /// Quantity held server-side for `product_id`.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map(|item| item.quantity)
    }
}

impl ApiClient {
    /// Fetch the signed-in user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<ServerCart> {
        self.get("/cart/").await
    }

    /// Add a product that is not yet in the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let body = json!({ "product_id": product_id, "quantity": quantity });
        self.send_unit(self.request(Method::POST, "/cart/items/").json(body))
            .await
    }

    /// Set the quantity of a product already in the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn update_item(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let path = format!("/cart/items/{product_id}");
        let body = json!({ "quantity": quantity });
        self.send_unit(self.request(Method::PUT, &path).json(body))
            .await
    }

    /// Remove a product from the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: ProductId) -> Result<()> {
        let path = format!("/cart/items/{product_id}");
        self.send_unit(self.request(Method::DELETE, &path)).await
    }

    /// Empty the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<()> {
        self.send_unit(self.request(Method::DELETE, "/cart/clear"))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::http::RequestBody;
    use crate::testing::Harness;

    #[test]
    fn test_server_cart_tolerates_sparse_items() {
        let cart: ServerCart =
            serde_json::from_value(json!({"items": [{"product_id": 5, "quantity": 2}]})).unwrap();
        assert_eq!(cart.quantity_of(ProductId::new(5)), Some(2));
        assert_eq!(cart.quantity_of(ProductId::new(6)), None);
        assert!(cart.items[0].name.is_none());

        let empty: ServerCart = serde_json::from_value(json!({})).unwrap();
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn test_item_calls_use_expected_shapes() {
        let h = Harness::new();
        h.backend.respond(Method::POST, "/cart/items/", 201, json!({}));
        h.backend.respond(Method::PUT, "/cart/items/5", 200, json!({}));

        let api = h.api();
        api.add_item(ProductId::new(7), 1).await.unwrap();
        api.update_item(ProductId::new(5), 3).await.unwrap();

        let sent = h.backend.requests();
        assert_eq!(
            sent[0].body,
            RequestBody::Json(json!({"product_id": 7, "quantity": 1}))
        );
        assert_eq!(sent[1].url, "http://api.test/cart/items/5");
        assert_eq!(sent[1].body, RequestBody::Json(json!({"quantity": 3})));
    }
}
