//! pulselb daemon
//!
//! Accepts worker heartbeats and forwards all other traffic to live workers.

use anyhow::Context;
use clap::Parser;
use pulselb_api::{create_router, AppState};
use pulselb_core::BalancerConfig;
use pulselb_network::{LivenessMonitor, NodeRegistry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// pulselbd - heartbeat-driven round-robin load balancer
#[derive(Parser, Debug)]
#[command(name = "pulselbd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind the balancer
    #[arg(long)]
    address: Option<String>,

    /// Port for the balancer
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

/// Load the config file, if any, and apply command-line overrides
fn load_config(args: &Args) -> anyhow::Result<BalancerConfig> {
    let mut config = match &args.config {
        Some(path) => BalancerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BalancerConfig::default(),
    };

    if let Some(address) = &args.address {
        config.server.address = address.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.to_lowercase();
    }

    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // Initialize logging; RUST_LOG takes precedence when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set subscriber")?;

    info!("Starting pulselb daemon v{}", env!("CARGO_PKG_VERSION"));

    let registry = Arc::new(NodeRegistry::new());
    let monitor = LivenessMonitor::new(registry.clone(), &config.health).spawn();

    let state = Arc::new(AppState::new(registry, &config)?);
    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.address, config.server.port)
        .parse()
        .context("Invalid address")?;

    info!("Balancer listening on {}", addr);
    info!("Workers post heartbeats to {}", config.server.heartbeat_path);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    monitor.stop().await;
    info!("pulselb daemon stopped");

    Ok(())
}
