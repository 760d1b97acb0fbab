//! Well-known event topics.

/// A player started playing a new track.
pub const PLAYER_TRACK_STARTED: &str = "player.track_started";

/// The server finished starting up and all plugins are loaded.
pub const SERVER_STARTED: &str = "server.started";

/// The server is about to tear down its plugins.
pub const SERVER_STOPPING: &str = "server.stopping";

/// A plugin finished `setup` and is serving. Carries `plugin` and `version`.
pub const PLUGIN_LOADED: &str = "plugin.loaded";

/// A plugin was torn down and its registrations revoked. Carries `plugin`.
pub const PLUGIN_UNLOADED: &str = "plugin.unloaded";
