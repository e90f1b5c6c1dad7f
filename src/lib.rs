//! OrderBuddy conversational ordering bot
//!
//! A multi-tenant conversation engine for ordering from a product catalog
//! over a chat channel. Each (tenant, user) pair gets its own conversation
//! that walks from greeting through menu browsing, cart management and a
//! three-step checkout, with optional external payment confirmation.

#![allow(non_snake_case)]

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{OrderBuddyError, Result};

// Re-export main components for easy access
pub use handlers::{dispatch, notify_payment_result, process_message, ExecutionContext, Reply, StoreProfile};
pub use state::{Conversation, ConversationRegistry, ConversationState, RegistryManager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
