//! Command handlers and the entries the registry stores for them.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde_json::Value;
use uuid::Uuid;

use resonance_core::result::AppResult;
use resonance_core::types::PluginId;

/// Per-request information passed to a command handler.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Identifies this dispatch in logs.
    pub request_id: Uuid,
    /// The player the request targets, if any.
    pub player_id: Option<String>,
    /// The client that issued the request, if known.
    pub client: Option<String>,
}

impl CommandContext {
    /// Creates a context with no player or client attached.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            player_id: None,
            client: None,
        }
    }

    /// Sets the target player.
    pub fn with_player(mut self, player_id: impl Into<String>) -> Self {
        self.player_id = Some(player_id.into());
        self
    }

    /// Sets the requesting client.
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A callable that answers one named command.
///
/// `command` is the full request array; `command[0]` is the command name
/// and the remaining elements are its arguments.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handles the command and returns its JSON result.
    async fn call(&self, ctx: &CommandContext, command: &[Value]) -> AppResult<Value>;
}

type BoxedCommandFn =
    dyn Fn(CommandContext, Vec<Value>) -> BoxFuture<'static, AppResult<Value>> + Send + Sync;

/// Adapts an async closure into a [`CommandHandler`].
#[derive(Clone)]
pub struct FnCommandHandler {
    handler: Arc<BoxedCommandFn>,
}

impl FnCommandHandler {
    /// Wraps `f`, which receives owned copies of the context and request.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(CommandContext, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Value>> + Send + 'static,
    {
        Self {
            handler: Arc::new(
                move |ctx: CommandContext, command: Vec<Value>| -> BoxFuture<'static, AppResult<Value>> {
                    Box::pin(f(ctx, command))
                },
            ),
        }
    }
}

impl fmt::Debug for FnCommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCommandHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl CommandHandler for FnCommandHandler {
    async fn call(&self, ctx: &CommandContext, command: &[Value]) -> AppResult<Value> {
        (self.handler)(ctx.clone(), command.to_vec()).await
    }
}

/// A registered command together with the plugin instance that owns it.
#[derive(Clone)]
pub struct CommandEntry {
    /// Globally unique command name.
    pub name: String,
    /// Owning plugin instance.
    pub owner: PluginId,
    /// The handler invoked on dispatch.
    pub handler: Arc<dyn CommandHandler>,
    /// When the command was registered.
    pub registered_at: DateTime<Utc>,
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("registered_at", &self.registered_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[tokio::test]
    async fn test_fn_handler_receives_request() {
        let handler = FnCommandHandler::new(|ctx: CommandContext, command: Vec<Value>| async move {
            Ok(json!({
                "player": ctx.player_id,
                "args": command.len() - 1,
            }))
        });

        let ctx = CommandContext::new().with_player("aa:bb");
        let result = handler
            .call(&ctx, &[json!("echo"), json!(1), json!(2)])
            .await
            .unwrap();

        assert_eq!(result["player"], "aa:bb");
        assert_eq!(result["args"], 2);
    }
}
