//! Hierarchical UI menu contributed by plugins.
//!
//! Nodes attach to a parent that is either a reserved root id or a node
//! already registered by any plugin. Siblings are ordered by weight, then
//! by registration order. A node whose parent is later revoked stays
//! registered but is no longer reachable from the roots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use resonance_core::error::AppError;
use resonance_core::result::AppResult;
use resonance_core::types::PluginId;

/// A menu entry as supplied by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    /// Globally unique node id.
    pub id: String,
    /// Id of the parent node or reserved root.
    pub parent: String,
    /// Display text.
    pub text: String,
    /// Sort key among siblings, ascending.
    pub weight: i32,
}

impl MenuNode {
    /// Creates a new menu node.
    pub fn new(
        id: impl Into<String>,
        parent: impl Into<String>,
        text: impl Into<String>,
        weight: i32,
    ) -> Self {
        Self {
            id: id.into(),
            parent: parent.into(),
            text: text.into(),
            weight,
        }
    }
}

/// A registered menu node and its owner.
#[derive(Debug, Clone, Serialize)]
pub struct MenuEntry {
    /// The node as registered.
    pub node: MenuNode,
    /// Owning plugin instance.
    pub owner: PluginId,
    #[serde(skip)]
    seq: u64,
}

/// One node of the rendered menu, with its ordered children.
#[derive(Debug, Clone, Serialize)]
pub struct MenuTreeNode {
    /// Node id.
    pub id: String,
    /// Display text.
    pub text: String,
    /// Sort weight.
    pub weight: i32,
    /// Owning plugin instance.
    pub owner: PluginId,
    /// Children in display order.
    pub children: Vec<MenuTreeNode>,
}

/// Storage for menu nodes. Not synchronized; the registry wraps it in a lock.
#[derive(Debug)]
pub(crate) struct MenuTree {
    roots: Vec<String>,
    nodes: HashMap<String, MenuEntry>,
    next_seq: u64,
}

impl MenuTree {
    pub(crate) fn new(roots: Vec<String>) -> Self {
        Self {
            roots,
            nodes: HashMap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn roots(&self) -> &[String] {
        &self.roots
    }

    fn is_root(&self, id: &str) -> bool {
        self.roots.iter().any(|r| r == id)
    }

    pub(crate) fn insert(&mut self, node: MenuNode, owner: PluginId) -> AppResult<()> {
        if self.is_root(&node.id) || self.nodes.contains_key(&node.id) {
            return Err(AppError::duplicate_name(format!(
                "Menu node '{}' is already registered",
                node.id
            )));
        }
        if !self.is_root(&node.parent) && !self.nodes.contains_key(&node.parent) {
            return Err(AppError::unknown_parent(format!(
                "Menu node '{}' has unknown parent '{}'",
                node.id, node.parent
            )));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.nodes
            .insert(node.id.clone(), MenuEntry { node, owner, seq });
        Ok(())
    }

    /// Removes `id` only if `owner` registered it.
    pub(crate) fn remove_owned(&mut self, id: &str, owner: PluginId) -> bool {
        match self.nodes.get(id) {
            Some(entry) if entry.owner == owner => {
                self.nodes.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Removes every node owned by `owner`, returning how many were removed.
    pub(crate) fn revoke(&mut self, owner: PluginId) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|_, entry| entry.owner != owner);
        before - self.nodes.len()
    }

    pub(crate) fn get(&self, id: &str) -> Option<&MenuEntry> {
        self.nodes.get(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn owned_by(&self, owner: PluginId) -> Vec<String> {
        let mut ids: Vec<&MenuEntry> = self.nodes.values().filter(|e| e.owner == owner).collect();
        ids.sort_by_key(|e| e.seq);
        ids.into_iter().map(|e| e.node.id.clone()).collect()
    }

    /// Direct children of `parent` in display order.
    pub(crate) fn children(&self, parent: &str) -> Vec<&MenuEntry> {
        let mut children: Vec<&MenuEntry> = self
            .nodes
            .values()
            .filter(|e| e.node.parent == parent)
            .collect();
        children.sort_by_key(|e| (e.node.weight, e.seq));
        children
    }

    /// The subtree below `parent`, walking only reachable nodes.
    ///
    /// Parents must exist when a child is inserted, so any cycle can only be
    /// formed among orphans and is never reached from a root.
    pub(crate) fn subtree(&self, parent: &str) -> Vec<MenuTreeNode> {
        self.children(parent)
            .into_iter()
            .map(|entry| MenuTreeNode {
                id: entry.node.id.clone(),
                text: entry.node.text.clone(),
                weight: entry.node.weight,
                owner: entry.owner,
                children: self.subtree(&entry.node.id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use resonance_core::ErrorKind;

    fn tree() -> MenuTree {
        MenuTree::new(vec!["home".to_string()])
    }

    #[test]
    fn test_siblings_ordered_by_weight_then_insertion() {
        let mut menu = tree();
        let owner = PluginId::new();
        menu.insert(MenuNode::new("b", "home", "B", 20), owner).unwrap();
        menu.insert(MenuNode::new("a", "home", "A", 10), owner).unwrap();
        menu.insert(MenuNode::new("c", "home", "C", 20), owner).unwrap();

        let ids: Vec<_> = menu.children("home").iter().map(|e| e.node.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut menu = tree();
        let err = menu
            .insert(MenuNode::new("x", "nowhere", "X", 1), PluginId::new())
            .unwrap_err();
        assert!(err.is(ErrorKind::UnknownParent));
    }

    #[test]
    fn test_root_id_cannot_be_reused() {
        let mut menu = tree();
        let err = menu
            .insert(MenuNode::new("home", "home", "Home", 1), PluginId::new())
            .unwrap_err();
        assert!(err.is(ErrorKind::DuplicateName));
    }

    #[test]
    fn test_orphans_are_unreachable_after_parent_revoked() {
        let mut menu = tree();
        let parent_owner = PluginId::new();
        let child_owner = PluginId::new();
        menu.insert(MenuNode::new("tools", "home", "Tools", 1), parent_owner)
            .unwrap();
        menu.insert(MenuNode::new("tools.x", "tools", "X", 1), child_owner)
            .unwrap();

        assert_eq!(menu.revoke(parent_owner), 1);
        assert!(menu.get("tools.x").is_some());
        assert!(menu.subtree("home").is_empty());
    }

    #[test]
    fn test_remove_requires_owner() {
        let mut menu = tree();
        let owner = PluginId::new();
        menu.insert(MenuNode::new("n", "home", "N", 1), owner).unwrap();

        assert!(!menu.remove_owned("n", PluginId::new()));
        assert!(menu.remove_owned("n", owner));
        assert_eq!(menu.len(), 0);
    }
}
