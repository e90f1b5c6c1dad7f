//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::PaymentDestination;

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub bot: BotConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    pub store: StoreConfig,
    pub payment: PaymentDestination,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    pub token: String,
    #[serde(default)]
    pub admin_ids: Vec<i64>,
}

/// Conversation session lifecycle configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Idle time after which a conversation is reset or evicted
    pub timeout_seconds: u64,
    /// How often the background sweep runs
    pub sweep_interval_seconds: u64,
}

/// Store-level configuration for the tenant served by this process
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub tenant_id: String,
    pub currency_symbol: String,
    pub delivery_fee: Decimal,
    pub catalog_path: String,
    #[serde(default = "default_min_address_length")]
    pub min_address_length: usize,
    #[serde(default = "default_estimated_delivery_minutes")]
    pub estimated_delivery_minutes: u32,
}

fn default_min_address_length() -> usize {
    10
}

fn default_estimated_delivery_minutes() -> u32 {
    45
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30 * 60,
            sweep_interval_seconds: 60,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tenant_id: "default".to_string(),
            currency_symbol: "$".to_string(),
            delivery_fee: Decimal::ZERO,
            catalog_path: "catalog.json".to_string(),
            min_address_length: default_min_address_length(),
            estimated_delivery_minutes: default_estimated_delivery_minutes(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://localhost:6379".to_string(),
            prefix: "orderbuddy:".to_string(),
            ttl_seconds: 3600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: "logs".to_string(),
        }
    }
}

impl SessionConfig {
    /// Idle timeout as a chrono duration, `None` when the value does not fit
    pub fn timeout(&self) -> Option<chrono::Duration> {
        i64::try_from(self.timeout_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    /// Sweep interval as a std duration
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::from_file("config")
    }

    /// Load settings from a specific configuration file (extension optional)
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ORDERBUDDY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::OrderBuddyError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                token: String::new(),
                admin_ids: vec![],
            },
            sessions: SessionConfig::default(),
            store: StoreConfig::default(),
            payment: PaymentDestination {
                bank_name: String::new(),
                account_holder: String::new(),
                account_number: String::new(),
                alias: None,
            },
            redis: RedisConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
