//! Shopping cart models
//!
//! A cart is an ordered list of lines; insertion order is display order.
//! Adding a product whose option set matches an existing line bumps that
//! line's quantity instead of appending a duplicate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::{Product, ProductOption};

/// An option chosen for a cart line, cached at add time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub id: String,
    pub name: String,
    pub price_modifier: Decimal,
}

impl From<&ProductOption> for SelectedOption {
    fn from(option: &ProductOption) -> Self {
        Self {
            id: option.id.clone(),
            name: option.name.clone(),
            price_modifier: option.price_modifier,
        }
    }
}

/// One aggregated (product, option set) entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    /// Display name cached when the line was created
    pub name: String,
    pub unit_price: Decimal,
    /// Always >= 1
    pub quantity: u32,
    pub options: Vec<SelectedOption>,
}

impl CartLine {
    /// Unit price plus every option modifier
    pub fn unit_total(&self) -> Decimal {
        self.unit_price + self.options.iter().map(|o| o.price_modifier).sum::<Decimal>()
    }

    /// (unit price + option modifiers) x quantity
    pub fn line_total(&self) -> Decimal {
        self.unit_total() * Decimal::from(self.quantity)
    }

    fn option_key(options: &[SelectedOption]) -> Vec<&str> {
        let mut ids: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Same product with an identical option set, regardless of selection order
    fn matches(&self, product_id: &str, options: &[SelectedOption]) -> bool {
        self.product_id == product_id && Self::option_key(&self.options) == Self::option_key(options)
    }

    /// Human readable description, e.g. "2 x Pizza (Grande, Extra queso)"
    pub fn describe(&self) -> String {
        if self.options.is_empty() {
            format!("{} x {}", self.quantity, self.name)
        } else {
            let names: Vec<&str> = self.options.iter().map(|o| o.name.as_str()).collect();
            format!("{} x {} ({})", self.quantity, self.name, names.join(", "))
        }
    }
}

/// Ordered collection of cart lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of `product` with the given options.
    ///
    /// Returns the index of the line that now holds the product. A quantity
    /// of zero is treated as one.
    pub fn add(&mut self, product: &Product, quantity: u32, options: Vec<SelectedOption>) -> usize {
        let quantity = quantity.max(1);

        if let Some(index) = self.lines.iter().position(|line| line.matches(&product.id, &options)) {
            self.lines[index].quantity = self.lines[index].quantity.saturating_add(quantity);
            return index;
        }

        self.lines.push(CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            options,
        });
        self.lines.len() - 1
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line totals
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
