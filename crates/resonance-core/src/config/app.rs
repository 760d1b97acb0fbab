//! Server identity and shutdown configuration.

use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Display name announced in the `server.started` event.
    #[serde(default = "default_name")]
    pub name: String,
    /// Upper bound in seconds for tearing down all plugins on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_name() -> String {
    "Resonance".to_string()
}

fn default_shutdown_grace() -> u64 {
    30
}
