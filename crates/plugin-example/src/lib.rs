//! Example plugin for Resonance.
//!
//! Demonstrates the plugin API surface: a command (`example.hello`), a
//! menu node under `home`, event subscriptions, and the per-plugin data
//! directory. Everything it registers is cleaned up by the host on unload.

pub mod plugin;

use resonance_plugin::PluginManager;
use resonance_plugin_sdk::prelude::*;

pub use plugin::ExamplePlugin;

/// Catalog module name.
pub const MODULE: &str = "example";

/// Plugin version reported by `example.hello`.
pub const VERSION: &str = "0.1.0";

/// Manifest for running the plugin without a `plugin.toml` on disk.
pub fn manifest() -> PluginManifest {
    plugin_manifest!(
        name: "example",
        version: VERSION,
        description: "Demonstrates commands, menus, events, and plugin storage",
        author: "Resonance Team",
        module: MODULE
    )
}

/// Adds the compiled-in manifest unless a plugin with the same name is
/// already known, e.g. from a discovered `plugin.toml`. Returns whether it
/// was added.
pub async fn add_manifest_if_missing(manager: &PluginManager) -> AppResult<bool> {
    let manifest = manifest();
    if manager.state(&manifest.name).await.is_some() {
        return Ok(false);
    }
    manager.add_manifest(manifest).await?;
    Ok(true)
}

/// Adds the example plugin to the manager's catalog.
pub async fn register(manager: &PluginManager) -> AppResult<()> {
    manager
        .register_module(MODULE, factory::<ExamplePlugin>())
        .await
}
