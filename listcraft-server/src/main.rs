use anyhow::{Context, Result};
use clap::Parser;
use listcraft_core::ListcraftConfig;
use listcraft_server::{AppState, router};
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "listcraft.toml";

#[derive(Parser)]
#[command(name = "listcraft-server")]
#[command(about = "Serves marketplace listing and stock templates", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./listcraft.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Directory holding the template tree
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<ListcraftConfig> {
    let mut config = match &cli.config {
        Some(path) => ListcraftConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => ListcraftConfig::from_file(DEFAULT_CONFIG)
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG))?,
        None => ListcraftConfig::default(),
    };

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(root) = &cli.root {
        config.templates.root = root.clone();
    }
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let root = &config.templates.root;
    if !root.is_dir() {
        warn!(root = %root.display(), "template root does not exist");
    }

    let address = (config.server.host.as_str(), config.server.port);
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}:{}", address.0, address.1))?;
    info!(
        address = %listener.local_addr()?,
        root = %root.display(),
        "listcraft server listening"
    );

    axum::serve(listener, router(AppState::from_config(&config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
