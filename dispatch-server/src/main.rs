//! Dispatch Server
//!
//! Order lifecycle and driver-matching backend for food delivery.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use anyhow::Context;
use clap::Parser;
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Order lifecycle and driver-matching server for food delivery.
#[derive(Parser, Debug)]
#[command(name = "dispatch-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML file with the server, admin and pricing sections
    #[arg(short, long, env = "DISPATCH_CONFIG", default_value = "./dispatch-config.toml")]
    config: PathBuf,

    /// Listen address, overriding `server.listen`
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Apply pending migrations from `migrations/` before serving
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dispatch-server starting");

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded = config_loader
        .load()
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    let listen_addr = loaded.server.listen;
    let max_connections = loaded.server.max_db_connections;
    tracing::info!(
        tax_rate = %loaded.pricing.tax_rate,
        delivery_fee = %loaded.pricing.delivery_fee,
        minimum_order_amount = %loaded.pricing.minimum_order_amount,
        "pricing policy applied to new orders"
    );

    let pool = connect_database(max_connections, args.migrate).await?;
    let state = AppState::new(pool.clone(), loaded.into_shared());

    // SIGHUP swaps the pricing and admin sections; the pool keeps its size.
    let shutdown_notify = spawn_config_reload_handler(state.clone(), config_loader);

    let result = run_server(build_router(state), listen_addr).await;
    shutdown_notify.notify_one();

    pool.close().await;
    tracing::info!("database pool closed, shutdown complete");
    result.context("http server failed")
}

/// Open the order database and optionally bring its schema up to date.
async fn connect_database(max_connections: u32, migrate: bool) -> anyhow::Result<PgPool> {
    let database_url = get_database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await
        .context("connecting to the order database")?;
    tracing::info!(max_connections, "order database connected");

    if migrate {
        sqlx::migrate!("../migrations")
            .run(&pool)
            .await
            .context("running order schema migrations")?;
        tracing::info!("order schema migrations applied");
    }
    Ok(pool)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
