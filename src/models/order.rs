//! Order and payment models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::Cart;
use crate::utils::helpers::normalize_text;

/// Payment methods a customer can choose at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    MobileWallet,
}

impl PaymentMethod {
    /// All methods in prompt order
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::BankTransfer,
        PaymentMethod::MobileWallet,
    ];

    /// Resolve free text (a menu number or a keyword) to a method
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = normalize_text(text);
        if let Ok(index) = normalized.parse::<usize>() {
            return index.checked_sub(1).and_then(|i| Self::ALL.get(i).copied());
        }

        let words: Vec<&str> = normalized.split_whitespace().collect();
        let has = |keywords: &[&str]| words.iter().any(|w| keywords.contains(w));

        if has(&["efectivo", "cash", "contado"]) {
            Some(PaymentMethod::Cash)
        } else if has(&["transferencia", "transfer", "deposito", "banco", "bancaria"]) {
            Some(PaymentMethod::BankTransfer)
        } else if has(&["billetera", "wallet", "movil", "yape", "plin", "nequi"]) {
            Some(PaymentMethod::MobileWallet)
        } else {
            None
        }
    }

    /// Customer-facing label
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Efectivo",
            PaymentMethod::BankTransfer => "Transferencia bancaria",
            PaymentMethod::MobileWallet => "Billetera móvil",
        }
    }

    /// Whether the order waits for an out-of-band payment confirmation
    pub fn requires_external_confirmation(&self) -> bool {
        matches!(self, PaymentMethod::BankTransfer)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where bank-transfer payments should be sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDestination {
    pub bank_name: String,
    pub account_holder: String,
    pub account_number: String,
    #[serde(default)]
    pub alias: Option<String>,
}

/// What the order backend returns after creating an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub order_number: String,
    pub total: Decimal,
}

/// Subtotal, delivery fee and total for a cart.
///
/// This is the only place the delivery fee is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

impl OrderSummary {
    pub fn compute(cart: &Cart, delivery_fee: Decimal) -> Self {
        let subtotal = cart.subtotal();
        Self {
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
        }
    }
}
