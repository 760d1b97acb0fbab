//! Event bus: topic subscriptions tagged by owning plugin.
//!
//! `publish` snapshots the subscriber list before invoking anyone, so a
//! handler that subscribes or unsubscribes during delivery affects only
//! later publishes. Handlers run one after another in subscription order;
//! each runs under a timeout with panics caught, and a failing handler
//! never prevents delivery to the rest.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use resonance_core::events::Event;
use resonance_core::types::{PluginId, SubscriptionId};

use super::handler::EventHandler;
use crate::guard::guarded;
use crate::registry::dispatcher::DEFAULT_HANDLER_TIMEOUT;

/// A single topic subscription.
#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    owner: PluginId,
    handler: Arc<dyn EventHandler>,
}

#[derive(Default)]
struct Subscriptions {
    /// Topic → subscriptions in subscription order.
    by_topic: HashMap<String, Vec<Subscription>>,
    /// Subscription → topic, for removal by id.
    topics: HashMap<SubscriptionId, String>,
}

/// Publish/subscribe bus shared by the host and all plugins.
pub struct EventBus {
    subscriptions: RwLock<Subscriptions>,
    handler_timeout: Duration,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handler_timeout", &self.handler_timeout)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Creates an empty bus with the default handler timeout.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Subscriptions::default()),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    /// Overrides the per-handler timeout.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Subscribes `handler` to `topic` on behalf of `owner`.
    pub async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn EventHandler>,
        owner: PluginId,
    ) -> SubscriptionId {
        let id = SubscriptionId::new();
        let mut subs = self.subscriptions.write().await;
        subs.by_topic
            .entry(topic.to_string())
            .or_default()
            .push(Subscription { id, owner, handler });
        subs.topics.insert(id, topic.to_string());

        debug!(topic = %topic, plugin_id = %owner, subscription_id = %id, "Subscribed");
        id
    }

    /// Removes one subscription. Returns `false` if it did not exist.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write().await;
        let Some(topic) = subs.topics.remove(&id) else {
            return false;
        };

        if let Some(list) = subs.by_topic.get_mut(&topic) {
            list.retain(|s| s.id != id);
            if list.is_empty() {
                subs.by_topic.remove(&topic);
            }
        }
        true
    }

    /// Delivers `event` to every handler subscribed to its topic.
    pub async fn publish(&self, event: &Event) {
        let snapshot: Vec<Subscription> = self
            .subscriptions
            .read()
            .await
            .by_topic
            .get(&event.topic)
            .cloned()
            .unwrap_or_default();

        if snapshot.is_empty() {
            return;
        }

        debug!(
            topic = %event.topic,
            handler_count = snapshot.len(),
            "Publishing event"
        );

        for sub in snapshot {
            if let Err(failure) = guarded(self.handler_timeout, sub.handler.handle(event)).await {
                warn!(
                    topic = %event.topic,
                    plugin_id = %sub.owner,
                    subscription_id = %sub.id,
                    error = %failure,
                    "Event handler failed"
                );
            }
        }
    }

    /// Removes every subscription owned by `owner`. Calling this again is a no-op.
    pub async fn revoke_all(&self, owner: PluginId) -> usize {
        let mut guard = self.subscriptions.write().await;
        let Subscriptions { by_topic, topics } = &mut *guard;

        let mut removed = 0;
        by_topic.retain(|_, list| {
            list.retain(|s| {
                if s.owner == owner {
                    topics.remove(&s.id);
                    removed += 1;
                    false
                } else {
                    true
                }
            });
            !list.is_empty()
        });

        if removed > 0 {
            info!(plugin_id = %owner, subscriptions = removed, "Subscriptions revoked");
        }
        removed
    }

    /// Number of handlers subscribed to `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .by_topic
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Number of subscriptions held by `owner`.
    pub async fn subscriptions_owned_by(&self, owner: PluginId) -> usize {
        self.subscriptions
            .read()
            .await
            .by_topic
            .values()
            .flatten()
            .filter(|s| s.owner == owner)
            .count()
    }

    /// Total number of live subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.topics.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
