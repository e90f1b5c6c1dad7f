//! Catalog models
//!
//! Categories and products as supplied by a tenant's catalog backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A menu category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// A product option such as a size or an extra topping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: String,
    pub name: String,
    /// Added to the unit price when selected, may be negative
    #[serde(default)]
    pub price_modifier: Decimal,
}

/// A sellable product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<ProductOption>,
}

impl Product {
    /// Label used for an option in prompts: a, b, c...
    pub fn option_label(index: usize) -> char {
        (b'a' + (index % 26) as u8) as char
    }

    /// Resolve an option by its prompt label
    pub fn option_by_label(&self, label: char) -> Option<&ProductOption> {
        let label = label.to_ascii_lowercase();
        if !label.is_ascii_lowercase() {
            return None;
        }
        self.options.get((label as u8 - b'a') as usize)
    }
}
