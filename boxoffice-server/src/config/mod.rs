//! Configuration module for boxoffice-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;

use crate::config::file::{
    AccountSeed, CompensationConfig, EventSeed, FileConfig, OrdersConfig, StorageConfig,
};
use boxoffice_core::config::{CompensationPolicy, OrderSettings};
use boxoffice_core::entities::account::NewAccount;
use boxoffice_core::entities::event::{NewEvent, NewTicketClass};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Seed data for the memory backend.
#[derive(Debug, Clone, Default)]
pub struct Seed {
    pub events: Vec<NewEvent>,
    pub accounts: Vec<NewAccount>,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub storage: StorageConfig,
    /// Hot-reloadable part, handed to the engine's `ConfigStore`.
    pub settings: OrderSettings,
    pub seed: Seed,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI overrides, validate.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        Self::parse(&config_content, self.listen_override)
    }

    /// Reload the configuration (used during SIGHUP).
    ///
    /// Only the order settings of the result are applied at runtime.
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    pub fn parse(
        content: &str,
        listen_override: Option<SocketAddr>,
    ) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;
        if let Some(listen) = listen_override {
            file_config.server.listen = listen;
        }
        validate(&file_config)?;

        Ok(LoadedConfig {
            listen: file_config.server.listen,
            settings: order_settings(&file_config.orders, &file_config.compensation),
            storage: file_config.storage,
            seed: Seed {
                events: file_config.events.into_iter().map(convert_event).collect(),
                accounts: file_config.accounts.into_iter().map(convert_account).collect(),
            },
        })
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.orders.payment_method.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "orders.payment_method must not be empty".to_string(),
        ));
    }
    if config.orders.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "orders.timeout_ms must be positive".to_string(),
        ));
    }
    if config.compensation.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "compensation.max_attempts must be at least 1".to_string(),
        ));
    }
    for event in &config.events {
        for class in &event.ticket_classes {
            if class.unit_price <= Decimal::ZERO {
                return Err(ConfigError::ValidationError(format!(
                    "ticket class {} of event {} must have a positive price",
                    class.label, event.name
                )));
            }
        }
    }
    for account in &config.accounts {
        if account.balance < Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "account {} has a negative balance",
                account.name
            )));
        }
    }
    Ok(())
}

fn order_settings(orders: &OrdersConfig, compensation: &CompensationConfig) -> OrderSettings {
    OrderSettings {
        payment_method: orders.payment_method.clone(),
        request_timeout: Duration::from_millis(orders.timeout_ms),
        compensation: CompensationPolicy {
            max_attempts: compensation.max_attempts,
            base_delay: Duration::from_millis(compensation.base_delay_ms),
        },
    }
}

fn convert_event(e: EventSeed) -> NewEvent {
    let utc = e.date.to_offset(time::UtcOffset::UTC);
    NewEvent {
        name: e.name,
        date: time::PrimitiveDateTime::new(utc.date(), utc.time()),
        location: e.location,
        description: e.description,
        ticket_classes: e
            .ticket_classes
            .into_iter()
            .map(|c| NewTicketClass {
                label: c.label,
                unit_price: c.unit_price,
                stock: c.stock,
            })
            .collect(),
    }
}

fn convert_account(a: AccountSeed) -> NewAccount {
    NewAccount {
        name: a.name,
        balance: a.balance,
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_conversion() {
        let loaded = ConfigLoader::parse(
            "[orders]\ntimeout_ms = 1200\n[compensation]\nmax_attempts = 2\nbase_delay_ms = 10\n",
            None,
        )
        .unwrap();
        assert_eq!(loaded.settings.request_timeout, Duration::from_millis(1200));
        assert_eq!(loaded.settings.payment_method, "QRIS");
        assert_eq!(loaded.settings.compensation.max_attempts, 2);
        assert_eq!(
            loaded.settings.compensation.base_delay,
            Duration::from_millis(10)
        );
    }

    #[test]
    fn test_listen_override_wins() {
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loaded =
            ConfigLoader::parse("[server]\nlisten = \"0.0.0.0:1\"\n", Some(addr)).unwrap();
        assert_eq!(loaded.listen, addr);
    }

    #[test]
    fn test_event_date_is_stored_as_utc() {
        let loaded = ConfigLoader::parse(
            r#"
[[events]]
name = "E1"
date = "2026-07-04T19:30:00+07:00"
location = "Jakarta"
"#,
            None,
        )
        .unwrap();
        assert_eq!(
            loaded.seed.events[0].date,
            time::macros::datetime!(2026-07-04 12:30)
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(matches!(
            ConfigLoader::parse("[orders]\ntimeout_ms = 0\n", None),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            ConfigLoader::parse("[compensation]\nmax_attempts = 0\n", None),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            ConfigLoader::parse("[[accounts]]\nname = \"x\"\nbalance = \"-1\"\n", None),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
