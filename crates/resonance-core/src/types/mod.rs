//! Core type definitions used across the Resonance workspace.

pub mod id;

pub use id::{PluginId, SubscriptionId};
