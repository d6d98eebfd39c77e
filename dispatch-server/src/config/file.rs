//! TOML file configuration structures.
//!
//! These structs directly map to the `dispatch-config.toml` file format.

use dispatch_core::config::AdminConfig as RuntimeAdminConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    #[serde(default = "default_max_db_connections")]
    pub max_db_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
            max_db_connections: default_max_db_connections(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_max_db_connections() -> u32 {
    10
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Checkout pricing section. Every field falls back to its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
    #[serde(default = "default_delivery_fee")]
    pub delivery_fee: Decimal,
    #[serde(default = "default_minimum_order_amount")]
    pub minimum_order_amount: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            delivery_fee: default_delivery_fee(),
            minimum_order_amount: default_minimum_order_amount(),
        }
    }
}

fn default_tax_rate() -> Decimal {
    dispatch_core::config::PricingConfig::default().tax_rate
}

fn default_delivery_fee() -> Decimal {
    dispatch_core::config::PricingConfig::default().delivery_fee
}

fn default_minimum_order_amount() -> Decimal {
    dispatch_core::config::PricingConfig::default().minimum_order_amount
}

impl FileConfig {
    pub fn is_admin_secret_hashed(&self) -> bool {
        RuntimeAdminConfig::is_hashed(&self.admin.secret)
    }
}
