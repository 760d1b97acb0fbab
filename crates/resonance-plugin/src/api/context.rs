//! Plugin context: the only handle a plugin gets to host services.
//!
//! Every registration made through a context is recorded in the plugin
//! instance's [`SessionLedger`] and tagged with its [`PluginId`]. After the
//! instance is torn down the context is closed; any clone a plugin kept
//! around fails with `ContextClosed` instead of leaking new registrations.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use resonance_core::error::AppError;
use resonance_core::events::Event;
use resonance_core::result::AppResult;
use resonance_core::types::{PluginId, SubscriptionId};

use super::session::{RevocationReport, SessionLedger};
use crate::events::bus::EventBus;
use crate::events::handler::{EventHandler, FnEventHandler};
use crate::registry::Registry;
use crate::registry::commands::{CommandContext, CommandHandler, FnCommandHandler};
use crate::registry::menu::MenuNode;

struct ContextInner {
    plugin_id: PluginId,
    name: String,
    version: String,
    data_dir: PathBuf,
    registry: Arc<Registry>,
    bus: Arc<EventBus>,
    ledger: Mutex<SessionLedger>,
}

/// Services available to one plugin instance. Cheap to clone.
///
/// Lock order: the instance ledger, then the registry or bus.
#[derive(Clone)]
pub struct PluginContext {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.inner.plugin_id)
            .field("name", &self.inner.name)
            .field("data_dir", &self.inner.data_dir)
            .finish_non_exhaustive()
    }
}

impl PluginContext {
    pub(crate) fn new(
        plugin_id: PluginId,
        name: &str,
        version: &str,
        data_dir: PathBuf,
        registry: Arc<Registry>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                plugin_id,
                name: name.to_string(),
                version: version.to_string(),
                data_dir,
                registry,
                bus,
                ledger: Mutex::new(SessionLedger::default()),
            }),
        }
    }

    /// Identity of this plugin instance.
    pub fn plugin_id(&self) -> PluginId {
        self.inner.plugin_id
    }

    /// Plugin name from the manifest.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Plugin version from the manifest.
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    /// Private data directory. Survives unload and reload.
    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    /// Whether this instance has been torn down.
    pub async fn is_closed(&self) -> bool {
        self.inner.ledger.lock().await.is_closed()
    }

    fn closed_error(&self) -> AppError {
        AppError::context_closed(format!(
            "Plugin '{}' ({}) has been unloaded",
            self.inner.name, self.inner.plugin_id
        ))
    }

    /// Registers a command owned by this plugin.
    pub async fn register_command(
        &self,
        name: &str,
        handler: Arc<dyn CommandHandler>,
    ) -> AppResult<()> {
        let mut ledger = self.inner.ledger.lock().await;
        if ledger.is_closed() {
            return Err(self.closed_error());
        }

        self.inner
            .registry
            .register_command(name, handler, self.inner.plugin_id)
            .await?;
        ledger.record_command(name);
        Ok(())
    }

    /// Registers an async closure as a command.
    pub async fn register_command_fn<F, Fut>(&self, name: &str, f: F) -> AppResult<()>
    where
        F: Fn(CommandContext, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Value>> + Send + 'static,
    {
        self.register_command(name, Arc::new(FnCommandHandler::new(f)))
            .await
    }

    /// Removes a command this plugin registered. Returns `false` if it owned no such command.
    pub async fn unregister_command(&self, name: &str) -> AppResult<bool> {
        let mut ledger = self.inner.ledger.lock().await;
        if ledger.is_closed() {
            return Err(self.closed_error());
        }

        let removed = self
            .inner
            .registry
            .unregister_command(name, self.inner.plugin_id)
            .await;
        if removed {
            ledger.forget_command(name);
        }
        Ok(removed)
    }

    /// Adds a node to the UI menu.
    pub async fn register_menu_node(&self, node: MenuNode) -> AppResult<()> {
        let mut ledger = self.inner.ledger.lock().await;
        if ledger.is_closed() {
            return Err(self.closed_error());
        }

        let id = node.id.clone();
        self.inner
            .registry
            .register_menu_node(node, self.inner.plugin_id)
            .await?;
        ledger.record_menu_node(&id);
        Ok(())
    }

    /// Removes a menu node this plugin registered.
    pub async fn unregister_menu_node(&self, id: &str) -> AppResult<bool> {
        let mut ledger = self.inner.ledger.lock().await;
        if ledger.is_closed() {
            return Err(self.closed_error());
        }

        let removed = self
            .inner
            .registry
            .unregister_menu_node(id, self.inner.plugin_id)
            .await;
        if removed {
            ledger.forget_menu_node(id);
        }
        Ok(removed)
    }

    /// Subscribes a handler to `topic`.
    pub async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn EventHandler>,
    ) -> AppResult<SubscriptionId> {
        if topic.trim().is_empty() {
            return Err(AppError::validation("Event topic must not be empty"));
        }

        let mut ledger = self.inner.ledger.lock().await;
        if ledger.is_closed() {
            return Err(self.closed_error());
        }

        let id = self
            .inner
            .bus
            .subscribe(topic, handler, self.inner.plugin_id)
            .await;
        ledger.record_subscription(id);
        Ok(id)
    }

    /// Subscribes an async closure to `topic`.
    pub async fn subscribe_fn<F, Fut>(&self, topic: &str, f: F) -> AppResult<SubscriptionId>
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        self.subscribe(topic, Arc::new(FnEventHandler::new(f))).await
    }

    /// Drops one of this plugin's subscriptions. Returns `false` if it held no such subscription.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> AppResult<bool> {
        let mut ledger = self.inner.ledger.lock().await;
        if ledger.is_closed() {
            return Err(self.closed_error());
        }
        if !ledger.subscriptions().contains(&id) {
            return Ok(false);
        }

        let removed = self.inner.bus.unsubscribe(id).await;
        ledger.forget_subscription(id);
        Ok(removed)
    }

    /// Publishes an event to all subscribers, including this plugin's own.
    pub async fn publish(&self, event: &Event) -> AppResult<()> {
        if self.is_closed().await {
            return Err(self.closed_error());
        }
        self.inner.bus.publish(event).await;
        Ok(())
    }

    /// Command names this instance currently owns.
    pub async fn registered_commands(&self) -> Vec<String> {
        self.inner.ledger.lock().await.commands().to_vec()
    }

    /// Menu node ids this instance currently owns.
    pub async fn registered_menu_nodes(&self) -> Vec<String> {
        self.inner.ledger.lock().await.menu_nodes().to_vec()
    }

    /// Number of subscriptions this instance currently holds.
    pub async fn subscription_count(&self) -> usize {
        self.inner.ledger.lock().await.subscriptions().len()
    }

    /// Removes everything this instance owns and closes the context.
    ///
    /// Revocation is by owner tag, so entries the ledger never saw are
    /// removed as well. Safe to call more than once.
    pub(crate) async fn revoke(&self) -> RevocationReport {
        let mut ledger = self.inner.ledger.lock().await;
        let owner = self.inner.plugin_id;

        let registry = self.inner.registry.revoke_all(owner).await;
        let subscriptions = self.inner.bus.revoke_all(owner).await;
        ledger.close();

        debug!(
            plugin_id = %owner,
            plugin = %self.inner.name,
            commands = registry.commands,
            menu_nodes = registry.menu_nodes,
            subscriptions,
            "Plugin context closed"
        );

        RevocationReport {
            commands: registry.commands,
            menu_nodes: registry.menu_nodes,
            subscriptions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use resonance_core::ErrorKind;
    use serde_json::json;

    fn context(registry: Arc<Registry>, bus: Arc<EventBus>) -> PluginContext {
        PluginContext::new(
            PluginId::new(),
            "test",
            "1.0.0",
            PathBuf::from("/tmp/test"),
            registry,
            bus,
        )
    }

    #[tokio::test]
    async fn test_registrations_are_recorded_and_revoked() {
        let registry = Arc::new(Registry::default());
        let bus = Arc::new(EventBus::new());
        let ctx = context(registry.clone(), bus.clone());

        ctx.register_command_fn("test.ping", |_, _| async { Ok(json!("pong")) })
            .await
            .unwrap();
        ctx.register_menu_node(MenuNode::new("test", "home", "Test", 1))
            .await
            .unwrap();
        ctx.subscribe_fn("server.started", |_| async { Ok(()) })
            .await
            .unwrap();

        assert_eq!(ctx.registered_commands().await, vec!["test.ping".to_string()]);
        assert_eq!(ctx.subscription_count().await, 1);

        let report = ctx.revoke().await;
        assert_eq!(
            report,
            RevocationReport {
                commands: 1,
                menu_nodes: 1,
                subscriptions: 1
            }
        );
        assert_eq!(registry.command_count().await, 0);
        assert_eq!(registry.menu_node_count().await, 0);
        assert_eq!(bus.subscription_count().await, 0);
        assert!(ctx.revoke().await.total() == 0);
    }

    #[tokio::test]
    async fn test_closed_context_rejects_registration() {
        let registry = Arc::new(Registry::default());
        let bus = Arc::new(EventBus::new());
        let ctx = context(registry.clone(), bus.clone());
        let stale = ctx.clone();

        ctx.revoke().await;

        let err = stale
            .register_command_fn("late", |_, _| async { Ok(json!(null)) })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::ContextClosed));

        let err = stale
            .subscribe_fn("server.started", |_| async { Ok(()) })
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::ContextClosed));

        assert_eq!(registry.command_count().await, 0);
        assert_eq!(bus.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_only_touches_own_subscriptions() {
        let registry = Arc::new(Registry::default());
        let bus = Arc::new(EventBus::new());
        let ctx = context(registry.clone(), bus.clone());
        let other = context(registry, bus.clone());

        let mine = ctx
            .subscribe_fn("server.started", |_| async { Ok(()) })
            .await
            .unwrap();
        let theirs = other
            .subscribe_fn("server.started", |_| async { Ok(()) })
            .await
            .unwrap();

        assert!(!ctx.unsubscribe(theirs).await.unwrap());
        assert_eq!(bus.subscriber_count("server.started").await, 2);

        assert!(ctx.unsubscribe(mine).await.unwrap());
        assert_eq!(ctx.subscription_count().await, 0);
        assert_eq!(bus.subscriber_count("server.started").await, 1);
        assert!(!ctx.unsubscribe(mine).await.unwrap());

        ctx.revoke().await;
        let err = ctx.unsubscribe(mine).await.unwrap_err();
        assert!(err.is(ErrorKind::ContextClosed));
        assert_eq!(other.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_registration_is_not_recorded() {
        let registry = Arc::new(Registry::default());
        let bus = Arc::new(EventBus::new());
        let ctx = context(registry, bus);

        let err = ctx
            .register_menu_node(MenuNode::new("orphan", "missing", "Orphan", 1))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::UnknownParent));
        assert!(ctx.registered_menu_nodes().await.is_empty());
    }
}
