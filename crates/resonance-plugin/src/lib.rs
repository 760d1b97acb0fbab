//! # resonance-plugin
//!
//! Plugin host for Resonance. Provides:
//!
//! - Command registry with owner-tagged entries and a panic-safe dispatcher
//! - Plugin-contributed menu tree with weight ordering
//! - Topic event bus with snapshot delivery and per-handler isolation
//! - Plugin lifecycle management with unconditional revocation on teardown
//! - Manifest discovery and a catalog of compiled-in plugin modules

pub mod api;
pub mod catalog;
pub mod events;
mod guard;
pub mod macros;
pub mod manager;
pub mod manifest;
pub mod prelude;
pub mod registry;
pub mod traits;

pub use api::context::PluginContext;
pub use catalog::PluginCatalog;
pub use events::bus::EventBus;
pub use manager::{LifecycleReport, PluginInfo, PluginManager, PluginState};
pub use manifest::PluginManifest;
pub use registry::Registry;
pub use registry::dispatcher::CommandDispatcher;
pub use traits::Plugin;
