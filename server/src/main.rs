use anyhow::Context;
use clap::Parser;
use gadget_server::config::{Args, ServerConfig};
use gadget_server::http;
use gadget_server::queue::CommandQueue;
use gadget_server::store::FsCommandStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from(Args::parse());

    let level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if !config.commands_dir.is_dir() {
        warn!(
            "Commands directory {} does not exist, every device is unknown",
            config.commands_dir.display()
        );
    }

    let store = Arc::new(FsCommandStore::new(config.commands_dir.clone()));
    let app = http::router(CommandQueue::new(store));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(
        addr = %config.bind,
        commands_dir = %config.commands_dir.display(),
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
