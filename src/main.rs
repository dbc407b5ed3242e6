mod client;
mod command;
mod config;
mod poller;

use anyhow::Context;
use clap::Parser;
use client::HttpControlClient;
use command::CommandExecutor;
use config::{AgentConfig, Args};
use poller::Poller;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AgentConfig::from(Args::parse());

    // Initialize tracing
    let level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Gadget agent starting: {}", config.device_id);
    info!("  Server: {}", config.server_url);
    if let Some(program) = &config.exec {
        info!("  Handler: {}", program.display());
    }

    let api = HttpControlClient::new(&config.server_url, config.request_timeout)
        .context("failed to build HTTP client")?;
    let executor = CommandExecutor::new(config.device_id.clone(), config.exec.clone());
    let mut poller = Poller::new(config.device_id.clone(), api, executor);

    if config.once {
        let outcome = poller.poll_once().await.context("poll failed")?;
        info!("Poll: {} (state {:?})", outcome, poller.state());
        return Ok(());
    }

    poller.run(config.poll_interval, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
