//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use dispatch_core::framework::DatabaseProcessor;
use sqlx::PgPool;

/// Cloneable and cheap to pass around; the pool and every config section
/// are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Runtime configuration (sections can be reloaded via SIGHUP).
    pub config: SharedConfig,
}

impl AppState {
    pub fn new(db: PgPool, config: SharedConfig) -> Self {
        Self { db, config }
    }

    pub fn processor(&self) -> DatabaseProcessor {
        DatabaseProcessor::new(self.db.clone())
    }
}
