//! Topic-based event bus for plugin subscriptions.

pub mod bus;
pub mod handler;

pub use bus::EventBus;
pub use handler::{EventHandler, FnEventHandler};
