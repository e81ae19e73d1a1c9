mod approvals;
mod bootstrap;
mod executor;
mod health;
mod hr;
mod workflow;
mod workforce;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use storeops_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use storeops_core::config::LogFormat::*;
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
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let api = Router::new()
        .merge(approvals::router(app.workflow.clone()))
        .merge(hr::router(app.hr_state.clone()));

    let address =
        format!("{}:{}", app.config.server.bind_address, app.config.server.api_port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "storeops-server listening"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(
                event_name = "system.server.signal_error",
                correlation_id = "shutdown",
                error = %error,
                "failed to listen for shutdown signal"
            );
            return;
        }
        tracing::info!(
            event_name = "system.server.stopping",
            correlation_id = "shutdown",
            "shutdown signal received, draining connections"
        );
        let _ = shutdown_tx.send(true);
    });

    let graceful = axum::serve(listener, api).with_graceful_shutdown({
        let mut shutdown_rx = shutdown_rx.clone();
        async move {
            let _ = shutdown_rx.wait_for(|stopping| *stopping).await;
        }
    });
    let drain_deadline = {
        let mut shutdown_rx = shutdown_rx;
        async move {
            let _ = shutdown_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(grace).await;
        }
    };

    tokio::select! {
        result = graceful => result?,
        _ = drain_deadline => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "open connections exceeded the drain deadline"
            );
        }
    }

    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "storeops-server stopped"
    );

    Ok(())
}
