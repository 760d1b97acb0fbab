//! # resonance-plugin-sdk
//!
//! SDK for developing plugins for the Resonance server.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resonance_plugin_sdk::prelude::*;
//!
//! #[derive(Default)]
//! struct MyPlugin;
//!
//! #[async_trait]
//! impl Plugin for MyPlugin {
//!     async fn setup(&self, ctx: &PluginContext) -> AppResult<()> {
//!         ctx.register_command_fn("my.ping", |_, _| async { Ok(json!("pong")) })
//!             .await?;
//!         ctx.register_menu_node(MenuNode::new("myPlugin", "home", "My Plugin", 500))
//!             .await
//!     }
//!
//!     async fn teardown(&self, _ctx: &PluginContext) -> AppResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! manager.register_module("my-plugin", factory::<MyPlugin>()).await?;
//! ```
//!
//! Everything registered through the context is removed by the host when
//! the plugin is unloaded; `teardown` only needs to release what the
//! plugin holds outside the host.

use std::sync::Arc;

use resonance_plugin::traits::Plugin;

/// Prelude for convenient imports.
pub mod prelude {
    pub use resonance_plugin::prelude::*;

    pub use crate::{arg_str, factory};
}

/// A catalog factory producing a fresh `P` for every load.
pub fn factory<P>() -> impl Fn() -> Arc<dyn Plugin> + Send + Sync + 'static
where
    P: Plugin + Default + 'static,
{
    || {
        tracing::trace!(plugin_type = std::any::type_name::<P>(), "Instantiating plugin");
        Arc::new(P::default()) as Arc<dyn Plugin>
    }
}

/// Positional argument `index` of a command request as a string.
///
/// Strings are returned as-is; other JSON values are rendered. `None` if
/// the argument is absent or `null`.
pub fn arg_str(command: &[serde_json::Value], index: usize) -> Option<String> {
    match command.get(index)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_arg_str() {
        let command = vec![json!("cmd"), json!("Ada"), json!(3), json!(null)];
        assert_eq!(arg_str(&command, 1).as_deref(), Some("Ada"));
        assert_eq!(arg_str(&command, 2).as_deref(), Some("3"));
        assert_eq!(arg_str(&command, 3), None);
        assert_eq!(arg_str(&command, 9), None);
    }
}
