//! Resonance Server: plugin host
//!
//! Main entry point: loads configuration, initializes logging, brings up
//! the plugin host, and tears every plugin down on shutdown.

use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use resonance_core::config::AppConfig;
use resonance_core::error::AppError;
use resonance_core::events::{Event, topics};
use resonance_plugin::PluginManager;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("RESONANCE_CONFIG") {
        Ok(path) => AppConfig::from_file(&path),
        Err(_) => {
            let env = std::env::var("RESONANCE_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        name = %config.server.name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting Resonance"
    );

    // ── Step 1: Plugin catalog ───────────────────────────────────
    let manager = PluginManager::new(config.plugins.clone());
    plugin_example::register(&manager).await?;

    // ── Step 2: Discovery ────────────────────────────────────────
    let discovered = manager.discover().await?;
    plugin_example::add_manifest_if_missing(&manager).await?;
    tracing::info!(
        discovered,
        directory = %config.plugins.directory,
        "Plugin discovery complete"
    );

    // ── Step 3: Load ─────────────────────────────────────────────
    if config.plugins.auto_load {
        let report = manager.load_all().await;
        for (name, error) in &report.failed {
            tracing::warn!(plugin = %name, error = %error, "Plugin failed to load");
        }
    } else {
        tracing::info!("Plugin auto-load disabled");
    }

    manager.publish(&Event::new(topics::SERVER_STARTED)).await;
    tracing::info!(
        plugins = manager.running().await.len(),
        commands = manager.registry().command_count().await,
        "Resonance is ready"
    );

    // ── Step 4: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    manager.publish(&Event::new(topics::SERVER_STOPPING)).await;

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let report = manager.shutdown_within(grace).await;
    for (name, error) in &report.failed {
        tracing::warn!(plugin = %name, error = %error, "Plugin was not shut down cleanly");
    }
    if report.failed.is_empty() {
        tracing::info!("Resonance shut down cleanly");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
