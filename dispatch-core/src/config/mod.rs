//! Runtime configuration for Dispatch.
//!
//! These are the validated values the server works with. Reading and
//! parsing the TOML file lives in the server crate.

mod admin;
mod pricing;
mod server;

pub use admin::AdminConfig;
pub use pricing::{PriceQuote, PricingConfig};
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
///
/// A SIGHUP reload swaps sections one at a time without blocking readers of
/// the others.
#[derive(Clone)]
pub struct SharedConfig {
    pub server: Arc<RwLock<ServerConfig>>,
    /// Admin authentication.
    pub admin: Arc<RwLock<AdminConfig>>,
    /// Tax, delivery fee and minimum order policy applied at checkout.
    pub pricing: Arc<RwLock<PricingConfig>>,
}

impl SharedConfig {
    pub fn new(server: ServerConfig, admin: AdminConfig, pricing: PricingConfig) -> Self {
        Self {
            server: Arc::new(RwLock::new(server)),
            admin: Arc::new(RwLock::new(admin)),
            pricing: Arc::new(RwLock::new(pricing)),
        }
    }
}
