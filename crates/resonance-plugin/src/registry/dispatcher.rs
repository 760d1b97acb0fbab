//! Command dispatcher: routes a request array to its registered handler.
//!
//! - `command[0]` must be a string naming a registered command.
//! - The handler runs under a timeout with panics caught.
//! - Any handler failure is logged with its detail and reported to the
//!   caller as a generic `CommandFailed` error.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error};

use resonance_core::error::AppError;
use resonance_core::result::AppResult;

use super::Registry;
use super::commands::CommandContext;
use crate::guard::guarded;

/// Default upper bound for one handler call.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches command requests against a [`Registry`].
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    registry: Arc<Registry>,
    handler_timeout: Duration,
}

impl CommandDispatcher {
    /// Creates a dispatcher with the default handler timeout.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    /// Overrides the per-call handler timeout.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Runs the command named by `command[0]`.
    pub async fn dispatch(&self, ctx: &CommandContext, command: &[Value]) -> AppResult<Value> {
        let name = command
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::validation("Request must start with a command name"))?;

        let entry = self.registry.lookup_command(name).await?;

        debug!(
            command = %name,
            plugin_id = %entry.owner,
            request_id = %ctx.request_id,
            args = command.len() - 1,
            "Dispatching command"
        );

        match guarded(self.handler_timeout, entry.handler.call(ctx, command)).await {
            Ok(value) => Ok(value),
            Err(failure) => {
                error!(
                    command = %name,
                    plugin_id = %entry.owner,
                    request_id = %ctx.request_id,
                    error = %failure,
                    "Command handler failed"
                );
                Err(AppError::command_failed(format!(
                    "Command '{name}' failed"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use resonance_core::ErrorKind;
    use resonance_core::types::PluginId;
    use serde_json::json;

    use crate::registry::commands::FnCommandHandler;

    async fn dispatcher() -> CommandDispatcher {
        let registry = Arc::new(Registry::default());
        let owner = PluginId::new();
        registry
            .register_command(
                "sum",
                Arc::new(FnCommandHandler::new(|_, command: Vec<Value>| async move {
                    let total: i64 = command[1..].iter().filter_map(Value::as_i64).sum();
                    Ok(json!(total))
                })),
                owner,
            )
            .await
            .unwrap();
        registry
            .register_command(
                "fail",
                Arc::new(FnCommandHandler::new(|_, _| async {
                    Err(AppError::internal("database password is hunter2"))
                })),
                owner,
            )
            .await
            .unwrap();
        registry
            .register_command(
                "explode",
                Arc::new(FnCommandHandler::new(|_, _| async {
                    if true {
                        panic!("handler bug");
                    }
                    Ok(json!(null))
                })),
                owner,
            )
            .await
            .unwrap();
        CommandDispatcher::new(registry)
    }

    #[tokio::test]
    async fn test_dispatch_passes_arguments() {
        let dispatcher = dispatcher().await;
        let result = dispatcher
            .dispatch(&CommandContext::new(), &[json!("sum"), json!(2), json!(40)])
            .await
            .unwrap();
        assert_eq!(result, json!(42));
    }

    #[tokio::test]
    async fn test_unknown_command_is_not_found() {
        let dispatcher = dispatcher().await;
        let err = dispatcher
            .dispatch(&CommandContext::new(), &[json!("nope")])
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_malformed_request_is_validation_error() {
        let dispatcher = dispatcher().await;
        for request in [vec![], vec![json!(5)]] {
            let err = dispatcher
                .dispatch(&CommandContext::new(), &request)
                .await
                .unwrap_err();
            assert!(err.is(ErrorKind::Validation));
        }
    }

    #[tokio::test]
    async fn test_handler_error_is_generic() {
        let dispatcher = dispatcher().await;
        let err = dispatcher
            .dispatch(&CommandContext::new(), &[json!("fail")])
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::CommandFailed));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let dispatcher = dispatcher().await;
        let err = dispatcher
            .dispatch(&CommandContext::new(), &[json!("explode")])
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::CommandFailed));

        // The host keeps serving after the panic.
        let ok = dispatcher
            .dispatch(&CommandContext::new(), &[json!("sum"), json!(1)])
            .await
            .unwrap();
        assert_eq!(ok, json!(1));
    }
}
