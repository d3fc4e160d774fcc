//! TOML file configuration structures.
//!
//! These structs directly map to the `boxoffice-config.toml` file format.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
    #[serde(default)]
    pub compensation: CompensationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Events loaded into the memory backend at startup.
    #[serde(default)]
    pub events: Vec<EventSeed>,
    /// Accounts loaded into the memory backend at startup.
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// `[orders]` section. Reloaded on SIGHUP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersConfig {
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    /// Default deadline for one order, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            payment_method: default_payment_method(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_payment_method() -> String {
    "QRIS".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

/// `[compensation]` section. Reloaded on SIGHUP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    50
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Connection pool size for the Postgres backend.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSeed {
    pub name: String,
    /// RFC 3339 timestamp, stored as UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub date: time::OffsetDateTime,
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ticket_classes: Vec<TicketClassSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketClassSeed {
    pub label: String,
    pub unit_price: Decimal,
    pub stock: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSeed {
    pub name: String,
    #[serde(default)]
    pub balance: Decimal,
}
