//! Framewall server binary.
//!
//! Startup order: parse CLI, init tracing, load configuration, render the
//! placeholder frame, spawn the relay workers, generate the dashboard and
//! provisioning artifacts, then serve the shard listeners.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use framewall_core::bus::tcp::TcpBusConnector;
use framewall_server::{
    bootstrap,
    config::{ConfigLoad, ConfigLoader},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "framewall-server")]
#[command(about = "Frame relay with per-topic MJPEG live-view streams")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "FRAMEWALL_CONFIG")]
    config: Option<PathBuf>,

    /// First shard port (overrides config)
    #[arg(short, long, env = "FRAMEWALL_PORT")]
    port: Option<u16>,

    /// Bind host (overrides config)
    #[arg(long, env = "FRAMEWALL_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config {
        loader = loader.with_config_path(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = cli.port {
        config.server.base_port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }

    for warning in &warnings {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    info!(
        topics = config.subscriptions.len(),
        base_port = config.server.base_port,
        streams_per_port = config.server.streams_per_port,
        dev_mode = config.server.dev_mode,
        "configuration loaded"
    );

    let config = Arc::new(config);
    let placeholder = bootstrap::build_placeholder()?;

    let connector = TcpBusConnector::new();
    let (registry, _workers) = bootstrap::spawn_relay(&config, &connector).await?;

    if let Err(err) = bootstrap::provision_dashboard(&config) {
        warn!(error = %err, "dashboard generation failed, relay still serves");
    }
    if let Err(err) = bootstrap::run_provisioning(&config) {
        warn!(error = %err, "provisioning generation failed, relay still serves");
    }

    bootstrap::serve(config, registry, placeholder).await
}
