//! In-memory cart model.

use medico_core::{Price, ProductId};
use serde::{Deserialize, Serialize};

use crate::api::ServerCart;
use crate::catalog::{self, Product};

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub name: String,
    pub price: Price,
    pub price_label: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl CartLine {
    /// A line for `quantity` units of `product`.
    #[must_use]
    pub fn new(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            quantity,
            name: product.name.clone(),
            price: product.price,
            price_label: product.price_label(),
            image: Some(product.image.clone()),
        }
    }

    /// `price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Ordered cart lines, at most one per product, every quantity positive.
///
/// Stored as a plain list. Loading folds duplicate and empty entries so a
/// hand-edited file cannot break the invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in &lines {
            cart.apply_delta(line, i64::from(line.quantity));
        }
        cart
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from the backend's copy.
    ///
    /// Display fields the server leaves out are filled from the catalog.
    /// Zero-quantity and duplicate entries are folded away.
    #[must_use]
    pub fn from_server(server: &ServerCart) -> Self {
        let mut cart = Self::new();
        for item in &server.items {
            let known = catalog::find(item.product_id);
            let name = item
                .name
                .clone()
                .or_else(|| known.as_ref().map(|p| p.name.clone()))
                .unwrap_or_else(|| format!("Product #{}", item.product_id));
            let price = item
                .price
                .or_else(|| known.as_ref().map(|p| p.price))
                .unwrap_or(Price::ZERO);
            let image = item
                .image
                .clone()
                .or_else(|| known.map(|p| p.image));

            let template = CartLine {
                product_id: item.product_id,
                quantity: 0,
                name,
                price,
                price_label: price.label(),
                image,
            };
            cart.apply_delta(&template, i64::from(item.quantity));
        }
        cart
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Quantity held for `product_id` (0 when absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.line(product_id).map_or(0, |l| l.quantity)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of every line's subtotal.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Names of every product in the cart.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.name.as_str())
    }

    /// Add `quantity` units of `product`. Returns the new quantity.
    pub fn add(&mut self, product: &Product, quantity: u32) -> u32 {
        self.apply_delta(&CartLine::new(product, 0), i64::from(quantity))
    }

    /// Adjust a line's quantity by `delta`.
    ///
    /// A line that reaches zero is removed; a missing line is created from
    /// `template` when `delta` is positive. Returns the new quantity.
    pub fn apply_delta(&mut self, template: &CartLine, delta: i64) -> u32 {
        let position = self
            .lines
            .iter()
            .position(|l| l.product_id == template.product_id);

        let current = position
            .and_then(|i| self.lines.get(i))
            .map_or(0, |l| i64::from(l.quantity));
        let updated = u32::try_from((current + delta).max(0)).unwrap_or(u32::MAX);

        match (position, updated) {
            (Some(i), 0) => {
                self.lines.remove(i);
            }
            (Some(i), n) => {
                if let Some(line) = self.lines.get_mut(i) {
                    line.quantity = n;
                }
            }
            (None, 0) => {}
            (None, n) => self.lines.push(CartLine {
                quantity: n,
                ..template.clone()
            }),
        }
        updated
    }

    /// Remove a line entirely, returning it.
    pub fn remove(&mut self, product_id: ProductId) -> Option<CartLine> {
        let position = self.lines.iter().position(|l| l.product_id == product_id)?;
        Some(self.lines.remove(position))
    }

    /// Remove every line, returning them.
    pub fn clear(&mut self) -> Vec<CartLine> {
        std::mem::take(&mut self.lines)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn product(id: i32) -> Product {
        catalog::find(ProductId::new(id)).unwrap()
    }

    #[test]
    fn test_totals_track_every_change() {
        let mut cart = Cart::new();
        cart.add(&product(1), 2); // 5.90
        cart.add(&product(3), 1); // 12.90
        cart.add(&product(1), 1);

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.count(), 4);
        assert_eq!(cart.total(), Price::from_paise(590 * 3 + 1290));

        let template = cart.line(ProductId::new(3)).unwrap().clone();
        assert_eq!(cart.apply_delta(&template, -1), 0);
        assert_eq!(cart.total(), Price::from_paise(590 * 3));
    }

    #[test]
    fn test_quantity_never_goes_negative() {
        let mut cart = Cart::new();
        cart.add(&product(5), 1);
        let template = cart.line(ProductId::new(5)).unwrap().clone();

        assert_eq!(cart.apply_delta(&template, -3), 0);
        assert!(cart.is_empty());
        assert_eq!(cart.apply_delta(&template, -1), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_from_server_fills_display_fields() {
        let server: ServerCart = serde_json::from_value(json!({"items": [
            {"product_id": 5, "quantity": 2},
            {"product_id": 42, "quantity": 1, "name": "Vitamin D3 1000IU", "price": "120"},
            {"product_id": 43, "quantity": 0},
        ]}))
        .unwrap();

        let cart = Cart::from_server(&server);

        assert_eq!(cart.lines().len(), 2);
        let bp = cart.line(ProductId::new(5)).unwrap();
        assert_eq!(bp.name, "BP Monitor");
        assert_eq!(bp.price_label, "₹45.00");
        assert_eq!(cart.line(ProductId::new(42)).unwrap().price_label, "₹120.00");
        assert_eq!(cart.total(), Price::from_paise(4500 * 2 + 12000));
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut cart = Cart::new();
        cart.add(&product(7), 1);
        let value = serde_json::to_value(&cart).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["product_id"], 7);

        let back: Cart = serde_json::from_value(value).unwrap();
        assert_eq!(back, cart);
    }

    #[test]
    fn test_loading_folds_duplicates_and_empty_lines() {
        let stored = vec![
            CartLine::new(&product(5), 1),
            CartLine::new(&product(7), 0),
            CartLine::new(&product(5), 2),
        ];
        let value = serde_json::to_value(&stored).unwrap();

        let cart: Cart = serde_json::from_value(value).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(ProductId::new(5)), 3);
        assert!(cart.line(ProductId::new(7)).is_none());
    }
}
