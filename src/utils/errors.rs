//! Error handling for OrderBuddy
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for OrderBuddy
#[derive(Error, Debug)]
pub enum OrderBuddyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Order creation failed: {0}")]
    OrderCreation(String),

    #[error("Invalid conversation snapshot: {0}")]
    Snapshot(String),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for OrderBuddy operations
pub type Result<T> = std::result::Result<T, OrderBuddyError>;

impl OrderBuddyError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            OrderBuddyError::Config(_) => false,
            OrderBuddyError::ConfigLoad(_) => false,
            OrderBuddyError::InvalidTransition { .. } => true,
            OrderBuddyError::InvalidInput(_) => true,
            OrderBuddyError::Catalog(_) => true,
            OrderBuddyError::OrderCreation(_) => true,
            OrderBuddyError::Snapshot(_) => false,
            OrderBuddyError::Telegram(_) => true,
            OrderBuddyError::Redis(_) => true,
            OrderBuddyError::Serialization(_) => false,
            OrderBuddyError::Io(_) => true,
            OrderBuddyError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OrderBuddyError::Config(_) => ErrorSeverity::Critical,
            OrderBuddyError::ConfigLoad(_) => ErrorSeverity::Critical,
            OrderBuddyError::InvalidTransition { .. } => ErrorSeverity::Info,
            OrderBuddyError::InvalidInput(_) => ErrorSeverity::Info,
            OrderBuddyError::Catalog(_) => ErrorSeverity::Warning,
            OrderBuddyError::OrderCreation(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
