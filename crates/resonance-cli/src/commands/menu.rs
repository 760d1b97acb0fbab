//! Menu inspection command.

use clap::Args;

use resonance_core::config::AppConfig;
use resonance_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for `menu`
#[derive(Debug, Args)]
pub struct MenuArgs {
    /// Root to print; defaults to every configured root
    pub root: Option<String>,
}

/// Execute `menu`
pub async fn execute(
    args: &MenuArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let manager = super::start_host(config).await?;

    let roots = match &args.root {
        Some(root) => vec![root.clone()],
        None => manager.registry().menu_roots().await,
    };
    for root in &roots {
        let tree = manager.registry().menu_tree(root).await;
        output::print_menu(root, &tree, format);
    }

    manager.shutdown().await;
    Ok(())
}
