mod bootstrap;
mod health;
mod services;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use confetti_core::config::{AppConfig, LoadOptions};
use tracing::info;

fn init_logging(config: &AppConfig) {
    use confetti_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operation.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Bootstrap with the same config we already loaded.
    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.store.clone(),
        app.catalog.clone(),
    )
    .await?;

    // Reveals that were pending when the previous process stopped fire on
    // their original timetable (or immediately, if overdue).
    let rearmed = app.reveals.rearm_pending().await;
    if rearmed > 0 {
        info!(rearmed, "re-armed pending quiz reveals");
    }

    info!(
        transport_mode = if app.slack_runner.is_noop_transport() { "noop" } else { "socket" },
        timezone = %app.config.schedule.timezone,
        channel = %app.config.channels.daily_buzz,
        "confetti-server starting"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let dispatcher = Arc::new(app.dispatcher);
    let dispatcher_task = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.run(shutdown_rx).await })
    };

    app.slack_runner.start().await?;

    info!("confetti-server started");
    wait_for_shutdown().await?;
    info!("confetti-server stopping");

    // Stop ticking and give in-flight actions a bounded window to finish.
    let _ = shutdown_tx.send(true);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if tokio::time::timeout(grace, dispatcher_task).await.is_err() {
        info!(grace_secs = grace.as_secs(), "in-flight actions exceeded the grace period");
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
