//! Daily per-store traffic
//!
//! Reads every raw JSONL file written by `traffic-extract` and writes the
//! per-day, per-store visitor totals.

use clap::Parser;
use std::path::PathBuf;
use store_traffic_sim::infra::Config;
use store_traffic_sim::services::aggregate_daily;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "traffic-daily", version, about = "Aggregate raw readings into daily store traffic")]
struct Args {
    /// Path to TOML configuration file [default: $CONFIG_FILE, else config/dev.toml]
    #[arg(short, long)]
    config: Option<String>,

    /// Override the configured raw input directory
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Override the configured output file
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref());
    let input_dir = args.input_dir.unwrap_or_else(|| PathBuf::from(config.output_dir()));
    let output = args.output.unwrap_or_else(|| PathBuf::from(config.daily_output()));

    info!(git_hash = %env!("GIT_HASH"), input_dir = %input_dir.display(), "daily_started");
    let daily = aggregate_daily(&input_dir, &output)?;
    info!(rows = %daily.len(), output = %output.display(), "daily_complete");
    Ok(())
}
