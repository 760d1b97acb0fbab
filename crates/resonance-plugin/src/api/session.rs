//! Per-instance bookkeeping of everything a plugin registered.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use resonance_core::types::{PluginId, SubscriptionId};

use super::context::PluginContext;
use crate::traits::Plugin;

/// What one plugin instance has registered so far, in registration order.
///
/// Shared between the plugin's [`PluginContext`] and the host. Once
/// closed it accepts no further entries.
#[derive(Debug, Default)]
pub struct SessionLedger {
    commands: Vec<String>,
    menu_nodes: Vec<String>,
    subscriptions: Vec<SubscriptionId>,
    closed: bool,
}

impl SessionLedger {
    /// Command names recorded for this instance.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Menu node ids recorded for this instance.
    pub fn menu_nodes(&self) -> &[String] {
        &self.menu_nodes
    }

    /// Subscriptions recorded for this instance.
    pub fn subscriptions(&self) -> &[SubscriptionId] {
        &self.subscriptions
    }

    /// Whether the instance has been torn down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn record_command(&mut self, name: &str) {
        self.commands.push(name.to_string());
    }

    pub(crate) fn forget_command(&mut self, name: &str) {
        self.commands.retain(|c| c != name);
    }

    pub(crate) fn record_menu_node(&mut self, id: &str) {
        self.menu_nodes.push(id.to_string());
    }

    pub(crate) fn forget_menu_node(&mut self, id: &str) {
        self.menu_nodes.retain(|m| m != id);
    }

    pub(crate) fn record_subscription(&mut self, id: SubscriptionId) {
        self.subscriptions.push(id);
    }

    pub(crate) fn forget_subscription(&mut self, id: SubscriptionId) {
        self.subscriptions.retain(|s| *s != id);
    }

    /// Closes the ledger and clears every recorded entry.
    pub(crate) fn close(&mut self) {
        self.closed = true;
        self.commands.clear();
        self.menu_nodes.clear();
        self.subscriptions.clear();
    }
}

/// Counts of everything removed when a plugin instance was revoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevocationReport {
    /// Commands removed from the registry.
    pub commands: usize,
    /// Menu nodes removed from the registry.
    pub menu_nodes: usize,
    /// Subscriptions removed from the event bus.
    pub subscriptions: usize,
}

impl RevocationReport {
    /// Total number of entries removed.
    pub fn total(&self) -> usize {
        self.commands + self.menu_nodes + self.subscriptions
    }
}

/// A loaded plugin instance as held by the manager.
pub(crate) struct PluginSession {
    pub(crate) plugin: Arc<dyn Plugin>,
    pub(crate) context: PluginContext,
    pub(crate) loaded_at: DateTime<Utc>,
}

impl PluginSession {
    pub(crate) fn new(plugin: Arc<dyn Plugin>, context: PluginContext) -> Self {
        Self {
            plugin,
            context,
            loaded_at: Utc::now(),
        }
    }

    pub(crate) fn plugin_id(&self) -> PluginId {
        self.context.plugin_id()
    }

    pub(crate) fn name(&self) -> &str {
        self.context.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_clears_everything() {
        let mut ledger = SessionLedger::default();
        ledger.record_command("a");
        ledger.record_menu_node("m");
        ledger.record_subscription(SubscriptionId::new());

        ledger.close();
        assert!(ledger.is_closed());
        assert!(ledger.commands().is_empty());
        assert!(ledger.menu_nodes().is_empty());
        assert!(ledger.subscriptions().is_empty());
    }

    #[test]
    fn test_forget_removes_single_entry() {
        let mut ledger = SessionLedger::default();
        ledger.record_command("a");
        ledger.record_command("b");
        ledger.forget_command("a");
        assert_eq!(ledger.commands(), ["b".to_string()]);

        let keep = SubscriptionId::new();
        let gone = SubscriptionId::new();
        ledger.record_subscription(keep);
        ledger.record_subscription(gone);
        ledger.forget_subscription(gone);
        assert_eq!(ledger.subscriptions(), [keep]);
    }
}
