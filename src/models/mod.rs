//! Data models module
//!
//! Catalog, cart and order types shared by the state machine and its collaborators.

pub mod cart;
pub mod catalog;
pub mod order;

pub use cart::{Cart, CartLine, SelectedOption};
pub use catalog::{Category, Product, ProductOption};
pub use order::{OrderReceipt, OrderSummary, PaymentDestination, PaymentMethod};
