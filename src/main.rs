//! Intrusion Dashboard entry point
//!
//! Connects to the detection backend and prints an alert line for every
//! intrusion until Ctrl-C or the stream ends.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intrusion_dashboard::{Config, Session, TerminalDisplay};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    // Initialize logging (stderr, stdout belongs to the dashboard)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "intrusion_dashboard=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if config.log_json {
        tracing_subscriber::registry().with(filter).with(fmt_layer.json()).init();
    } else {
        tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    }

    tracing::info!("Intrusion Dashboard v{} starting...", env!("CARGO_PKG_VERSION"));
    tracing::info!("Stream: {}", config.stream_url);

    let session = Session::start(&config, TerminalDisplay::stdout())
        .context("Failed to start dashboard session")?;

    let (alerts, summary) = session.run(shutdown_signal()).await;

    tracing::info!(
        "Session {} closed: {} alert(s) from {} event(s), {} malformed frame(s) dropped",
        summary.session_id,
        alerts.len(),
        summary.events_received,
        summary.malformed_discarded
    );
    if let Ok(json) = serde_json::to_string(&summary) {
        tracing::debug!("Session summary: {}", json);
    }

    Ok(())
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
