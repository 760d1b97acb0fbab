//! CLI command definitions and dispatch.

pub mod config;
pub mod invoke;
pub mod menu;
pub mod plugins;

use clap::{Parser, Subcommand};
use tracing::debug;

use resonance_core::config::AppConfig;
use resonance_core::error::AppError;
use resonance_plugin::PluginManager;

use crate::output::{self, OutputFormat};

/// Resonance plugin host administration
#[derive(Debug, Parser)]
#[command(name = "resonance", version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file. When omitted, `config/default.toml`,
    /// `config/<env>.toml`, and `RESONANCE__*` variables are merged.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Configuration environment overlay
    #[arg(short, long, env = "RESONANCE_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Plugin discovery and status
    Plugins(plugins::PluginsArgs),
    /// Load plugins and run a single command against them
    Invoke(invoke::InvokeArgs),
    /// Load plugins and print the menu they contribute
    Menu(menu::MenuArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = self.load_config()?;
        match &self.command {
            Commands::Plugins(args) => plugins::execute(args, &config, self.format).await,
            Commands::Invoke(args) => invoke::execute(args, &config).await,
            Commands::Menu(args) => menu::execute(args, &config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, self.format).await,
        }
    }

    fn load_config(&self) -> Result<AppConfig, AppError> {
        match &self.config {
            Some(path) => AppConfig::from_file(path),
            None => AppConfig::load(&self.env),
        }
    }
}

/// Helper: build a plugin manager with the built-in catalog and every
/// known plugin loaded.
///
/// The example plugin is added from its compiled-in manifest when no
/// `plugin.toml` for it was discovered.
pub async fn start_host(config: &AppConfig) -> Result<PluginManager, AppError> {
    let manager = PluginManager::new(config.plugins.clone());
    plugin_example::register(&manager).await?;

    let discovered = manager.discover().await?;
    debug!(discovered, "Plugin discovery finished");
    plugin_example::add_manifest_if_missing(&manager).await?;

    let report = manager.load_all().await;
    for (name, error) in &report.failed {
        output::print_warning(&format!("Plugin '{name}' failed to load: {error}"));
    }

    Ok(manager)
}
