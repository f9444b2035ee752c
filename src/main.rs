//! Store traffic API - serves simulated visitor counts over HTTP
//!
//! Module structure:
//! - `domain/` - Simulation engine (Mt19937, Sensor, Store)
//! - `services/` - Store registry, query rules, daily aggregation
//! - `io/` - HTTP API, Prometheus exposition, JSONL egress
//! - `infra/` - Config, Metrics

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use store_traffic_sim::infra::{Config, Metrics};
use store_traffic_sim::io::{start_api_server, AppState};
use store_traffic_sim::services::StoreRegistry;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Store traffic API - simulated visitor counts per store and sensor
#[derive(Parser, Debug)]
#[command(name = "traffic-api", version, about)]
struct Args {
    /// Path to TOML configuration file [default: $CONFIG_FILE, else config/dev.toml]
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default INFO level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "traffic-api starting");

    let args = Args::parse();
    let config = Config::load(args.config.as_deref());

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        bind_address = %config.bind_address(),
        port = %config.api_port(),
        min_year = %config.min_year(),
        default_store = %config.default_store(),
        stores = %config.stores().len(),
        "config_loaded"
    );

    let addr: SocketAddr = format!("{}:{}", config.bind_address(), config.api_port()).parse()?;
    let registry = StoreRegistry::from_config(&config)?;
    let metrics = Arc::new(Metrics::new());
    let state = Arc::new(AppState::new(&config, registry, metrics.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Periodic metrics report
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics.report().log();
        }
    });

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    start_api_server(addr, state, shutdown_rx).await?;

    info!("traffic-api shutdown complete");
    Ok(())
}
