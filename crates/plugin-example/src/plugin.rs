//! Example plugin implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use resonance_plugin_sdk::prelude::*;

use crate::VERSION;

/// Command answered by this plugin.
pub const HELLO_COMMAND: &str = "example.hello";

/// Menu node contributed under `home`.
pub const MENU_NODE_ID: &str = "examplePlugin";

/// File in the plugin data directory holding lifetime totals.
pub const STATS_FILE: &str = "stats.json";

/// Totals persisted across loads.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeStats {
    /// Completed load cycles.
    pub sessions: u64,
    /// Tracks started over all load cycles.
    pub tracks_started: u64,
}

/// Counts tracks started while loaded and greets whoever asks.
#[derive(Debug, Default)]
pub struct ExamplePlugin {
    track_count: Arc<AtomicU64>,
}

impl ExamplePlugin {
    /// Tracks started during the current load cycle.
    pub fn tracks_started(&self) -> u64 {
        self.track_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for ExamplePlugin {
    async fn setup(&self, ctx: &PluginContext) -> AppResult<()> {
        self.track_count.store(0, Ordering::SeqCst);

        let count = self.track_count.clone();
        ctx.register_command_fn(HELLO_COMMAND, move |cmd, command| {
            let tracks = count.load(Ordering::SeqCst);
            async move { Ok(hello(&cmd, &command, tracks)) }
        })
        .await?;

        // High weight keeps it near the bottom of the home menu.
        ctx.register_menu_node(MenuNode::new(MENU_NODE_ID, "home", "Example Plugin", 1000))
            .await?;

        let count = self.track_count.clone();
        ctx.subscribe_fn(topics::PLAYER_TRACK_STARTED, move |_| {
            let total = count.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                debug!(total, "Example plugin: track started");
                Ok(())
            }
        })
        .await?;

        ctx.subscribe_fn(topics::SERVER_STARTED, |_| async {
            info!("Example plugin: server is fully started");
            Ok(())
        })
        .await?;

        info!(plugin_id = %ctx.plugin_id(), "Example plugin setup complete");
        Ok(())
    }

    async fn teardown(&self, ctx: &PluginContext) -> AppResult<()> {
        let tracks = self.track_count.swap(0, Ordering::SeqCst);

        let path = ctx.data_dir().join(STATS_FILE);
        let mut stats = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<LifetimeStats>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LifetimeStats::default(),
            Err(e) => return Err(e.into()),
        };
        stats.sessions += 1;
        stats.tracks_started += tracks;
        tokio::fs::write(&path, serde_json::to_vec_pretty(&stats)?).await?;

        info!(
            plugin_id = %ctx.plugin_id(),
            tracks_started = tracks,
            lifetime_tracks = stats.tracks_started,
            "Example plugin teardown"
        );
        Ok(())
    }
}

fn hello(ctx: &CommandContext, command: &[Value], tracks_started: u64) -> Value {
    let name = arg_str(command, 1).unwrap_or_else(|| "World".to_string());
    json!({
        "message": format!("Hello from example plugin, {name}!"),
        "version": VERSION,
        "tracks_started": tracks_started,
        "player_id": ctx.player_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_defaults_to_world() {
        let result = hello(&CommandContext::new(), &[json!(HELLO_COMMAND)], 0);
        assert_eq!(result["message"], "Hello from example plugin, World!");
        assert_eq!(result["version"], VERSION);
        assert_eq!(result["tracks_started"], 0);
        assert!(result["player_id"].is_null());
    }

    #[test]
    fn test_hello_uses_name_and_player() {
        let ctx = CommandContext::new().with_player("00:04:20:12:34:56");
        let result = hello(&ctx, &[json!(HELLO_COMMAND), json!("Ada")], 4);
        assert_eq!(result["message"], "Hello from example plugin, Ada!");
        assert_eq!(result["tracks_started"], 4);
        assert_eq!(result["player_id"], "00:04:20:12:34:56");
    }
}
