use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pricewatch_core::Settings;
use pricewatch_server::SessionDispatcher;
use pricewatch_telemetry::{init_telemetry, TelemetryConfig};
use pricewatch_upstream::UpstreamClients;

/// Live item price browser over WebSocket.
#[derive(Debug, Parser)]
#[command(name = "pricewatch", version)]
struct Args {
    /// JSON settings file, deep-merged over the defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port (overrides config and PRICEWATCH_PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Items per page.
    #[arg(long)]
    page_size: Option<usize>,

    /// Emit JSON log lines.
    #[arg(long)]
    log_json: bool,

    /// Default log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let guard = init_telemetry(TelemetryConfig {
        log_level: args.log_level,
        json: args.log_json,
        ..Default::default()
    });
    tracing::debug!(filter = guard.filter(), "Logging initialized");

    let mut settings = match &args.config {
        Some(path) => Settings::load_from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::load().context("loading settings")?,
    };
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(page_size) = args.page_size {
        settings.pagination.page_size = page_size;
    }
    settings.validate().context("invalid settings")?;

    tracing::info!(
        upstream = %settings.upstream.base_url,
        page_size = settings.pagination.page_size,
        concurrency = settings.pagination.effective_concurrency(),
        "Starting pricewatch"
    );

    let clients = UpstreamClients::new(&settings.upstream).context("building upstream client")?;
    let dispatcher = Arc::new(SessionDispatcher::new(
        clients.catalog,
        clients.prices,
        &settings.pagination,
    ));

    let handle = pricewatch_server::start(settings.server.clone(), dispatcher)
        .await
        .context("starting server")?;

    tracing::info!(port = handle.port, "Pricewatch ready");

    tokio::signal::ctrl_c()
        .await
        .context("listening for ctrl+c")?;

    tracing::info!("Shutting down");
    handle.shutdown();
    Ok(())
}
