//! Geoservice auth backend
//! Register, log in and log out with revocable bearer tokens

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use geoservice_backend::{app, config::LogConfig, config::Config};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "geoservice", about = "Geoservice authentication backend")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, env = "GEOSERVICE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env values are visible to clap and to the config loader
    let _ = dotenv();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.log);

    info!("🚀 Geoservice backend starting");
    app::run(config).await
}

/// Initialize tracing; `RUST_LOG` wins over the configured filter
fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
