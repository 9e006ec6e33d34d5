//! Deuce backend binary: loads configuration, builds the backend pair,
//! and serves the HTTP surface.

use anyhow::{Context, Result};
use clap::Parser;
use deuce_lib::config::Config;
use deuce_lib::log::initialize_logging;
use deuce_lib::services::Services;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "deuce")]
#[command(about = "Deuce content-addressed block storage service", long_about = None)]
struct Args {
    /// Path to a TOML config file; falls back to in-memory defaults when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Override the configured listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured listen port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    initialize_logging(config.log_format);

    info!(backend = %config.metadata_backend.kind, "starting deuce");

    let services = Services::from_config(&config).context("failed to build backends from config")?;
    let app = deuce_lib::create_app(services);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .context("failed to bind listener")?;

    info!("listening on http://{}:{}", config.host, config.port);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn load_config() -> Result<Config> {
    let args = Args::parse();

    let mut config = match args.config {
        Some(path) => Config::from_file(&path).with_context(|| format!("failed to read config file {path}"))?,
        None => Config::default(),
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    Ok(config)
}
