//! Binary entry point: load configuration, stand up the registry and the
//! HTTP/WebSocket router, serve.
//!
//! Grounded on the `#[tokio::main] async fn main() -> Result<(), anyhow::Error>`
//! shape of the teacher's `crates/cli/src/main.rs`; tracing setup follows
//! `crates/core/src/startup.rs::configure_tracing`, simplified down to the
//! `EnvFilter` + `fmt` layer (core-pinning, tracy, and the reloadable-filter
//! machinery there are specific to SpacetimeDB's own operational needs and
//! out of scope here).

use std::sync::Arc;

use fleetd_client_api::{build_router, Config};
use fleetd_core::Registry;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let registry = Arc::new(Registry::new());
    let router = build_router(registry, config.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "fleetd listening");
    axum::serve(listener, router).await?;

    Ok(())
}
