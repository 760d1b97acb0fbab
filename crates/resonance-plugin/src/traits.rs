//! The trait every plugin implements.

use async_trait::async_trait;

use resonance_core::result::AppResult;

use crate::api::context::PluginContext;

/// A plugin's two lifecycle entry points.
///
/// `setup` registers commands, menu nodes, and subscriptions through the
/// context. `teardown` releases anything the plugin holds outside the
/// host. It does not need to unregister what it registered: the host
/// revokes every entry owned by the instance after `teardown` returns,
/// whether or not it succeeded.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called once when the plugin instance is loaded.
    async fn setup(&self, ctx: &PluginContext) -> AppResult<()>;

    /// Called once when the plugin instance is unloaded.
    async fn teardown(&self, ctx: &PluginContext) -> AppResult<()>;
}
