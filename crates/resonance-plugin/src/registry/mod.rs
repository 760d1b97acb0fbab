//! Shared registry of plugin-contributed commands and menu nodes.
//!
//! Every entry is tagged with the [`PluginId`] of the instance that
//! registered it, so the host can remove everything a plugin owns with a
//! single [`Registry::revoke_all`] call regardless of what the plugin
//! itself remembered to clean up.

pub mod commands;
pub mod dispatcher;
pub mod menu;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use resonance_core::error::AppError;
use resonance_core::result::AppResult;
use resonance_core::types::PluginId;

use self::commands::{CommandEntry, CommandHandler};
use self::menu::{MenuEntry, MenuNode, MenuTree, MenuTreeNode};

/// Counts of entries removed by [`Registry::revoke_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevocationSummary {
    /// Commands removed.
    pub commands: usize,
    /// Menu nodes removed.
    pub menu_nodes: usize,
}

impl RevocationSummary {
    /// Total number of entries removed.
    pub fn total(&self) -> usize {
        self.commands + self.menu_nodes
    }
}

/// Command and menu registry shared by all plugins.
///
/// Lock order when both maps are needed: `commands`, then `menu`.
#[derive(Debug)]
pub struct Registry {
    commands: RwLock<HashMap<String, CommandEntry>>,
    menu: RwLock<MenuTree>,
}

impl Registry {
    /// Creates an empty registry with the given reserved menu roots.
    pub fn new(menu_roots: Vec<String>) -> Self {
        Self {
            commands: RwLock::new(HashMap::new()),
            menu: RwLock::new(MenuTree::new(menu_roots)),
        }
    }

    /// Registers a command. Fails with `DuplicateName` if the name is taken.
    pub async fn register_command(
        &self,
        name: &str,
        handler: Arc<dyn CommandHandler>,
        owner: PluginId,
    ) -> AppResult<()> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Command name must not be empty"));
        }

        let mut commands = self.commands.write().await;
        if let Some(existing) = commands.get(name) {
            return Err(AppError::duplicate_name(format!(
                "Command '{name}' is already registered by plugin {}",
                existing.owner
            )));
        }

        commands.insert(
            name.to_string(),
            CommandEntry {
                name: name.to_string(),
                owner,
                handler,
                registered_at: Utc::now(),
            },
        );

        debug!(command = %name, plugin_id = %owner, "Command registered");
        Ok(())
    }

    /// Removes a command if, and only if, `owner` registered it.
    pub async fn unregister_command(&self, name: &str, owner: PluginId) -> bool {
        let mut commands = self.commands.write().await;
        match commands.get(name) {
            Some(entry) if entry.owner == owner => {
                commands.remove(name);
                debug!(command = %name, plugin_id = %owner, "Command unregistered");
                true
            }
            _ => false,
        }
    }

    /// Looks up a command by name.
    pub async fn lookup_command(&self, name: &str) -> AppResult<CommandEntry> {
        self.commands
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Unknown command '{name}'")))
    }

    /// Names of all registered commands, sorted.
    pub async fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of the commands owned by `owner`, sorted.
    pub async fn commands_owned_by(&self, owner: PluginId) -> Vec<String> {
        let mut names: Vec<String> = self
            .commands
            .read()
            .await
            .values()
            .filter(|e| e.owner == owner)
            .map(|e| e.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Number of registered commands.
    pub async fn command_count(&self) -> usize {
        self.commands.read().await.len()
    }

    /// Registers a menu node.
    ///
    /// Fails with `DuplicateName` if the id is taken and with
    /// `UnknownParent` if the parent is neither a root nor a registered node.
    pub async fn register_menu_node(&self, node: MenuNode, owner: PluginId) -> AppResult<()> {
        let id = node.id.clone();
        self.menu.write().await.insert(node, owner)?;
        debug!(menu_node = %id, plugin_id = %owner, "Menu node registered");
        Ok(())
    }

    /// Removes a menu node if, and only if, `owner` registered it.
    pub async fn unregister_menu_node(&self, id: &str, owner: PluginId) -> bool {
        self.menu.write().await.remove_owned(id, owner)
    }

    /// Looks up a single menu node.
    pub async fn menu_node(&self, id: &str) -> Option<MenuEntry> {
        self.menu.read().await.get(id).cloned()
    }

    /// Direct children of `parent`, ordered by weight then registration order.
    pub async fn menu_children(&self, parent: &str) -> Vec<MenuEntry> {
        self.menu
            .read()
            .await
            .children(parent)
            .into_iter()
            .cloned()
            .collect()
    }

    /// The menu reachable from `root`, in display order.
    pub async fn menu_tree(&self, root: &str) -> Vec<MenuTreeNode> {
        self.menu.read().await.subtree(root)
    }

    /// The reserved menu roots.
    pub async fn menu_roots(&self) -> Vec<String> {
        self.menu.read().await.roots().to_vec()
    }

    /// Ids of the menu nodes owned by `owner`, in registration order.
    pub async fn menu_nodes_owned_by(&self, owner: PluginId) -> Vec<String> {
        self.menu.read().await.owned_by(owner)
    }

    /// Number of registered menu nodes.
    pub async fn menu_node_count(&self) -> usize {
        self.menu.read().await.len()
    }

    /// Removes every command and menu node owned by `owner`.
    ///
    /// Both maps are locked for the duration, so no dispatch observes a
    /// half-revoked plugin. Calling this again is a no-op.
    pub async fn revoke_all(&self, owner: PluginId) -> RevocationSummary {
        let mut commands = self.commands.write().await;
        let mut menu = self.menu.write().await;

        let before = commands.len();
        commands.retain(|_, entry| entry.owner != owner);
        let summary = RevocationSummary {
            commands: before - commands.len(),
            menu_nodes: menu.revoke(owner),
        };

        if summary.total() > 0 {
            info!(
                plugin_id = %owner,
                commands = summary.commands,
                menu_nodes = summary.menu_nodes,
                "Registry entries revoked"
            );
        }

        summary
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(vec!["home".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use resonance_core::ErrorKind;
    use serde_json::json;

    use super::commands::FnCommandHandler;

    fn handler() -> Arc<dyn CommandHandler> {
        Arc::new(FnCommandHandler::new(|_, _| async { Ok(json!(null)) }))
    }

    #[tokio::test]
    async fn test_duplicate_command_rejected() {
        let registry = Registry::default();
        let a = PluginId::new();
        let b = PluginId::new();

        registry.register_command("play", handler(), a).await.unwrap();
        let err = registry
            .register_command("play", handler(), b)
            .await
            .unwrap_err();

        assert!(err.is(ErrorKind::DuplicateName));
        assert_eq!(registry.lookup_command("play").await.unwrap().owner, a);
    }

    #[tokio::test]
    async fn test_unregister_requires_owner() {
        let registry = Registry::default();
        let owner = PluginId::new();
        registry.register_command("stop", handler(), owner).await.unwrap();

        assert!(!registry.unregister_command("stop", PluginId::new()).await);
        assert!(registry.unregister_command("stop", owner).await);
        assert!(
            registry
                .lookup_command("stop")
                .await
                .unwrap_err()
                .is(ErrorKind::NotFound)
        );
    }

    #[tokio::test]
    async fn test_revoke_all_is_scoped_and_idempotent() {
        let registry = Registry::default();
        let a = PluginId::new();
        let b = PluginId::new();

        registry.register_command("a.one", handler(), a).await.unwrap();
        registry.register_command("a.two", handler(), a).await.unwrap();
        registry.register_command("b.one", handler(), b).await.unwrap();
        registry
            .register_menu_node(MenuNode::new("a.menu", "home", "A", 1), a)
            .await
            .unwrap();

        let first = registry.revoke_all(a).await;
        assert_eq!(first, RevocationSummary { commands: 2, menu_nodes: 1 });

        let second = registry.revoke_all(a).await;
        assert_eq!(second.total(), 0);

        assert_eq!(registry.command_names().await, vec!["b.one".to_string()]);
        assert_eq!(registry.menu_node_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_command_name_rejected() {
        let registry = Registry::default();
        let err = registry
            .register_command("  ", handler(), PluginId::new())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
    }
}
