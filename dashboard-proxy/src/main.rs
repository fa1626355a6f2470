mod server;
mod service;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use dashboard_core::{Config, provider::provider_from_config};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::service::ProxyService;

/// Single-endpoint HTTP proxy that keeps the provider key on the server.
#[derive(Debug, Parser)]
#[command(name = "weather-proxy", version, about)]
struct Args {
    /// Address to listen on, overrides `[proxy] listen` from the config file
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load()?;

    let addr = match args.listen {
        Some(addr) => addr,
        None => config
            .proxy
            .listen
            .parse()
            .with_context(|| format!("Invalid listen address: {}", config.proxy.listen))?,
    };

    let provider = provider_from_config(&config)?;
    let service = Arc::new(ProxyService::new(Arc::from(provider)));

    let (bound, server) = warp::serve(server::routes(service))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Weather proxy listening on http://{}/api", bound);
    server.await;

    Ok(())
}
