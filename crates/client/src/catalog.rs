//! Built-in product catalog.
//!
//! The storefront ships with a fixed list of products and a "popular" strip.
//! Image search is a file-name heuristic: a product matches when any word of
//! its name appears in the uploaded file's name.

use medico_core::{Price, ProductId};
use serde::{Deserialize, Serialize};

use crate::symptom;

/// A product that can be put in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
}

impl Product {
    fn from_row(&(id, name, paise, image): &Row) -> Self {
        Self {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Price::from_paise(paise),
            image: image.to_string(),
        }
    }

    /// Display price, e.g. `₹5.90`.
    #[must_use]
    pub fn price_label(&self) -> String {
        self.price.label()
    }
}

type Row = (i32, &'static str, i64, &'static str);

static PRODUCTS: [Row; 8] = [
    (1, "Digital Thermometer", 590, "assets/images/thermometer-removebg-preview.webp"),
    (2, "Stethoscope", 2500, "assets/images/stethoscope-removebg-preview.webp"),
    (3, "Paracetamol (10 Strips)", 1290, "assets/images/paracetamol-tablet-removebg-preview.webp"),
    (4, "Syringe Pack (10 pcs)", 850, "assets/images/syringes.webp"),
    (5, "BP Monitor", 4500, "assets/images/shopping.webp"),
    (6, "Hand Sanitizer", 350, "assets/images/50ml-lifebuoy-hand-sanitizer-1000x1000-removebg-preview.png"),
    (7, "Glucometer", 3500, "assets/images/gluemetor.webp"),
    (8, "First Aid Kit", 1800, "assets/images/first-aid-kit.webp"),
];

static POPULAR: [Row; 5] = [
    (5, "BP Monitor", 4500, "assets/images/shopping.webp"),
    (7, "Glucometer", 3500, "assets/images/gluemetor.webp"),
    (9, "Nebulizer", 2800, "assets/images/nebulizer.webp"),
    (10, "Surgical Mask (50 pcs)", 900, "assets/images/surgical_mask.webp"),
    (11, "Pulse Oximeter", 2200, "assets/images/pulse.webp"),
];

/// The full product list.
#[must_use]
pub fn products() -> Vec<Product> {
    PRODUCTS.iter().map(Product::from_row).collect()
}

/// Products featured on the home page.
#[must_use]
pub fn popular_products() -> Vec<Product> {
    POPULAR.iter().map(Product::from_row).collect()
}

/// Look a product up by ID in either list, then among symptom-checker
/// medicines.
#[must_use]
pub fn find(id: ProductId) -> Option<Product> {
    PRODUCTS
        .iter()
        .chain(POPULAR.iter())
        .find(|row| row.0 == id.as_i32())
        .map(Product::from_row)
        .or_else(|| symptom::find_medicine(id).map(|m| m.product))
}

/// Products whose name shares a word with `file_name` (case-insensitive).
#[must_use]
pub fn search_by_image(file_name: &str) -> Vec<Product> {
    let file_name = file_name.to_lowercase();
    PRODUCTS
        .iter()
        .filter(|row| {
            row.1
                .to_lowercase()
                .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '-'))
                .any(|token| !token.is_empty() && file_name.contains(token))
        })
        .map(Product::from_row)
        .collect()
}
