//! Events published on the plugin event bus.
//!
//! Producers (player, server, plugin host) publish an [`Event`] under a
//! string topic; subscribers receive the event by reference. The topic
//! taxonomy is open; [`topics`] lists the ones the host itself emits.

pub mod topics;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single published event with a flexible key-value payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID.
    pub id: Uuid,
    /// Topic the event is published under, e.g. `player.track_started`.
    pub topic: String,
    /// Arbitrary data keyed by string.
    pub data: HashMap<String, serde_json::Value>,
    /// The player or client that caused the event, if any.
    pub actor: Option<String>,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Creates a new event with an empty payload.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            data: HashMap::new(),
            actor: None,
            timestamp: Utc::now(),
        }
    }

    /// Sets the actor.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Inserts a data value.
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Inserts an integer value.
    pub fn with_int(self, key: &str, value: i64) -> Self {
        self.with_data(key, serde_json::json!(value))
    }

    /// Gets a data value by key.
    pub fn get_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a string data value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Gets an i64 data value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accessors() {
        let event = Event::new(topics::PLAYER_TRACK_STARTED)
            .with_actor("aa:bb:cc:dd:ee:ff")
            .with_string("title", "Blue in Green")
            .with_int("duration", 337);

        assert_eq!(event.topic, "player.track_started");
        assert_eq!(event.actor.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(event.get_string("title"), Some("Blue in Green"));
        assert_eq!(event.get_i64("duration"), Some(337));
        assert!(event.get_data("missing").is_none());
    }
}
