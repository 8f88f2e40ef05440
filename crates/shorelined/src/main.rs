//! Shoreline daemon entry point.
//!
//! Detects the cable modem on the gateway address, then serves its signal
//! readings as Prometheus metrics.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use shoreline_core::{ModemRegistry, DEFAULT_GATEWAY};
use tracing::{info, warn, Level};

use shorelined::server::{self, AppState};

/// How long to wait before re-probing when no modem answered. Modems reboot
/// on firmware pushes and overnight provisioning; the daemon outwaits them.
const RESOLVE_RETRY: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "shorelined")]
#[command(about = "Exports cable modem signal readings as Prometheus metrics", long_about = None)]
#[command(version)]
struct Cli {
    /// Port to listen on when serving prometheus metrics
    #[arg(long, default_value_t = 6666)]
    port: u16,

    /// Base URL of the modem's status pages
    #[arg(long, default_value = DEFAULT_GATEWAY)]
    gateway: String,

    /// Parse a captured status page instead of polling a device
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Per-request timeout for modem fetches, in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("shorelined v{} starting", env!("CARGO_PKG_VERSION"));

    let client = Client::builder()
        .timeout(Duration::from_secs(cli.timeout_secs))
        .build()
        .context("building http client")?;

    let registry = ModemRegistry::standard();
    let modem = match cli.fixture.as_deref() {
        Some(path) => registry
            .resolve(&client, &cli.gateway, Some(path))
            .await
            .with_context(|| format!("fixture {} matched no supported modem", path.display()))?,
        None => loop {
            match registry.resolve(&client, &cli.gateway, None).await {
                Some(modem) => break modem,
                None => {
                    warn!(
                        "no modem detected at {}, retrying in {}s",
                        cli.gateway,
                        RESOLVE_RETRY.as_secs()
                    );
                    tokio::time::sleep(RESOLVE_RETRY).await;
                }
            }
        },
    };
    info!("detected {} at {}", modem.name(), cli.gateway);

    server::run(AppState::new(client, modem), cli.port).await
}
