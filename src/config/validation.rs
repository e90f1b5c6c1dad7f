//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use rust_decimal::Decimal;

use crate::models::PaymentDestination;
use crate::utils::errors::{OrderBuddyError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    validate_session_config(&settings.sessions)?;
    validate_store_config(&settings.store)?;
    validate_payment_destination(&settings.payment)?;
    validate_logging_config(&settings.logging)?;

    if settings.redis.enabled {
        validate_redis_config(&settings.redis)?;
    }

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(OrderBuddyError::Config(
            "Bot token is required".to_string()
        ));
    }

    Ok(())
}

/// Validate session configuration
fn validate_session_config(config: &super::SessionConfig) -> Result<()> {
    if config.timeout_seconds == 0 {
        return Err(OrderBuddyError::Config(
            "Session timeout must be greater than 0".to_string()
        ));
    }

    if config.timeout().is_none() {
        return Err(OrderBuddyError::Config(
            format!("Session timeout of {} seconds is out of range", config.timeout_seconds)
        ));
    }

    if config.sweep_interval_seconds == 0 {
        return Err(OrderBuddyError::Config(
            "Sweep interval must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate store configuration
fn validate_store_config(config: &super::StoreConfig) -> Result<()> {
    if config.tenant_id.is_empty() {
        return Err(OrderBuddyError::Config(
            "Store tenant id is required".to_string()
        ));
    }

    if config.delivery_fee < Decimal::ZERO {
        return Err(OrderBuddyError::Config(
            "Delivery fee cannot be negative".to_string()
        ));
    }

    if config.min_address_length == 0 {
        return Err(OrderBuddyError::Config(
            "Minimum address length must be greater than 0".to_string()
        ));
    }

    if config.catalog_path.is_empty() {
        return Err(OrderBuddyError::Config(
            "Catalog path is required".to_string()
        ));
    }

    Ok(())
}

/// Validate the bank-transfer destination shown to customers
fn validate_payment_destination(destination: &PaymentDestination) -> Result<()> {
    if destination.bank_name.is_empty() || destination.account_number.is_empty() {
        return Err(OrderBuddyError::Config(
            "Payment destination requires a bank name and an account number".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(OrderBuddyError::Config(
            "Redis URL is required".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(OrderBuddyError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.bot.token = "123:abc".to_string();
        settings.payment.bank_name = "Banco Central".to_string();
        settings.payment.account_number = "123-456".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_token_rejected() {
        let mut settings = valid_settings();
        settings.bot.token.clear();
        assert_matches!(validate_settings(&settings), Err(OrderBuddyError::Config(_)));
    }

    #[test]
    fn test_negative_fee_rejected() {
        let mut settings = valid_settings();
        settings.store.delivery_fee = Decimal::new(-1, 0);
        assert_matches!(validate_settings(&settings), Err(OrderBuddyError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = valid_settings();
        settings.sessions.timeout_seconds = 0;
        assert_matches!(validate_settings(&settings), Err(OrderBuddyError::Config(_)));
    }

    #[test]
    fn test_zero_min_address_length_rejected() {
        let mut settings = valid_settings();
        settings.store.min_address_length = 0;
        assert_matches!(validate_settings(&settings), Err(OrderBuddyError::Config(_)));
    }

    #[test]
    fn test_oversized_timeout_rejected() {
        let mut settings = valid_settings();
        settings.sessions.timeout_seconds = u64::MAX;
        assert_matches!(validate_settings(&settings), Err(OrderBuddyError::Config(_)));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        assert_matches!(validate_settings(&settings), Err(OrderBuddyError::Config(_)));
    }
}
