//! HTTP server settings.

use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Upper bound on pooled Postgres connections.
    pub max_db_connections: u32,
}
