//! Plugin discovery and status commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use resonance_core::config::AppConfig;
use resonance_core::error::AppError;
use resonance_plugin::manifest::{self, PluginManifest};
use resonance_plugin::PluginInfo;

use crate::output::{self, OutputFormat};

/// Arguments for plugin commands
#[derive(Debug, Args)]
pub struct PluginsArgs {
    /// Plugins subcommand
    #[command(subcommand)]
    pub command: PluginsCommand,
}

/// Plugins subcommands
#[derive(Debug, Subcommand)]
pub enum PluginsCommand {
    /// List manifests found in the plugin directory
    List,
    /// Validate every manifest in a directory
    Check {
        /// Directory to scan; defaults to the configured plugin directory
        dir: Option<PathBuf>,
    },
    /// Load all plugins and report their state
    Status,
}

/// Table row for a discovered manifest
#[derive(Debug, Serialize, Tabled)]
struct ManifestRow {
    /// Plugin name
    name: String,
    /// Version
    version: String,
    /// Catalog module
    module: String,
    /// Enabled
    enabled: String,
    /// Author
    author: String,
}

impl ManifestRow {
    fn new(manifest: &PluginManifest, config: &AppConfig) -> Self {
        let enabled = manifest.enabled && !config.plugins.is_disabled(&manifest.name);
        Self {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            module: manifest.module().to_string(),
            enabled: if enabled { "yes" } else { "no" }.to_string(),
            author: manifest.author.clone(),
        }
    }
}

/// Table row for a plugin's runtime state
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    /// Plugin name
    name: String,
    /// Version
    version: String,
    /// Lifecycle state
    state: String,
    /// Commands registered
    commands: usize,
    /// Menu nodes registered
    menu_nodes: usize,
    /// Event subscriptions
    subscriptions: usize,
    /// Last error
    error: String,
}

impl From<PluginInfo> for StatusRow {
    fn from(info: PluginInfo) -> Self {
        Self {
            name: info.name,
            version: info.version,
            state: info.state.to_string(),
            commands: info.commands.len(),
            menu_nodes: info.menu_nodes.len(),
            subscriptions: info.subscriptions,
            error: info.last_error.unwrap_or_default(),
        }
    }
}

/// Execute plugin commands
pub async fn execute(
    args: &PluginsArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        PluginsCommand::List => {
            let dir = PathBuf::from(&config.plugins.directory);
            let manifests = manifest::discover(&dir).await?;
            let rows: Vec<ManifestRow> =
                manifests.iter().map(|m| ManifestRow::new(m, config)).collect();
            output::print_list(&rows, format);
        }
        PluginsCommand::Check { dir } => {
            let dir = dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.plugins.directory));
            check(&dir).await?;
        }
        PluginsCommand::Status => {
            let manager = super::start_host(config).await?;
            let rows: Vec<StatusRow> = manager.list().await.into_iter().map(Into::into).collect();
            output::print_list(&rows, format);
            manager.shutdown().await;
        }
    }

    Ok(())
}

async fn check(dir: &std::path::Path) -> Result<(), AppError> {
    let manifests = manifest::discover(dir).await?;
    if manifests.is_empty() {
        output::print_warning(&format!("No plugin manifests found in '{}'", dir.display()));
        return Ok(());
    }

    let mut invalid = 0;
    for m in &manifests {
        match m.check() {
            Ok(()) => output::print_success(&format!("{} {} is valid", m.name, m.version)),
            Err(e) => {
                invalid += 1;
                output::print_error(&e.to_string());
            }
        }
    }

    if invalid > 0 {
        return Err(AppError::invalid_manifest(format!(
            "{invalid} of {} manifests are invalid",
            manifests.len()
        )));
    }
    Ok(())
}
