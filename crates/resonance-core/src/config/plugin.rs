//! Plugin host configuration.

use serde::{Deserialize, Serialize};

/// Plugin host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Directory scanned for `<name>/plugin.toml` manifests.
    #[serde(default = "default_plugin_directory")]
    pub directory: String,
    /// Root under which each plugin gets its own data directory.
    #[serde(default = "default_data_directory")]
    pub data_directory: String,
    /// Whether to automatically load discovered plugins on startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,
    /// Plugin names that are discovered but never loaded.
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Upper bound in seconds for a single command or event handler call.
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_seconds: u64,
    /// Reserved menu ids that plugins may attach top-level nodes to.
    #[serde(default = "default_menu_roots")]
    pub menu_roots: Vec<String>,
}

impl PluginConfig {
    /// Returns whether a plugin has been disabled by configuration.
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d == name)
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_directory(),
            data_directory: default_data_directory(),
            auto_load: true,
            disabled: Vec::new(),
            handler_timeout_seconds: default_handler_timeout(),
            menu_roots: default_menu_roots(),
        }
    }
}

fn default_plugin_directory() -> String {
    "./plugins".to_string()
}

fn default_data_directory() -> String {
    "./data/plugins".to_string()
}

fn default_true() -> bool {
    true
}

fn default_handler_timeout() -> u64 {
    30
}

fn default_menu_roots() -> Vec<String> {
    vec!["home".to_string()]
}
