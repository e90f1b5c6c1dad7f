//! Per-state handlers

pub mod cart;
pub mod checkout;
pub mod greeting;
pub mod info;
pub mod menu;
