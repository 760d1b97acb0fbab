//! Prelude for convenient imports.

pub use async_trait::async_trait;
pub use serde_json::{Value, json};

pub use resonance_core::error::{AppError, ErrorKind};
pub use resonance_core::events::{Event, topics};
pub use resonance_core::result::AppResult;
pub use resonance_core::types::{PluginId, SubscriptionId};

pub use crate::api::context::PluginContext;
pub use crate::events::handler::{EventHandler, FnEventHandler};
pub use crate::manifest::PluginManifest;
pub use crate::registry::commands::{CommandContext, CommandHandler, FnCommandHandler};
pub use crate::registry::menu::MenuNode;
pub use crate::traits::Plugin;

pub use crate::{event, plugin_manifest};
