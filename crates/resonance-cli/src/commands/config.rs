//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use resonance_core::config::AppConfig;
use resonance_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Summarize the configuration after it loaded successfully
    Validate,
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => output::print_item(config, format),
        ConfigCommand::Validate => {
            output::print_success("Configuration is valid");
            output::print_kv("Server", &config.server.name);
            output::print_kv("Plugin directory", &config.plugins.directory);
            output::print_kv("Plugin data", &config.plugins.data_directory);
            output::print_kv("Auto load", &config.plugins.auto_load.to_string());
            output::print_kv("Disabled", &config.plugins.disabled.join(", "));
            output::print_kv(
                "Handler timeout",
                &format!("{}s", config.plugins.handler_timeout_seconds),
            );
            output::print_kv("Menu roots", &config.plugins.menu_roots.join(", "));
            output::print_kv("Log level", &config.logging.level);
        }
    }

    Ok(())
}
