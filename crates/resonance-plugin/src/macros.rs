//! Convenience macros for plugin development.

/// Builds a [`PluginManifest`](crate::manifest::PluginManifest) for a
/// compiled-in plugin.
///
/// # Example
/// ```rust,ignore
/// let manifest = plugin_manifest!(
///     name: "now-playing",
///     version: "1.0.0",
///     description: "Shows the current track",
///     author: "Dev"
/// );
/// ```
#[macro_export]
macro_rules! plugin_manifest {
    (
        name: $name:expr,
        version: $version:expr,
        description: $desc:expr,
        author: $author:expr
    ) => {{
        let mut manifest = $crate::manifest::PluginManifest::new($name, $version);
        manifest.description = $desc.to_string();
        manifest.author = $author.to_string();
        manifest
    }};
    (
        name: $name:expr,
        version: $version:expr,
        description: $desc:expr,
        author: $author:expr,
        module: $module:expr
    ) => {{
        let mut manifest = $crate::plugin_manifest!(
            name: $name,
            version: $version,
            description: $desc,
            author: $author
        );
        manifest.module = Some($module.to_string());
        manifest
    }};
}

/// Builds an [`Event`](resonance_core::events::Event) with inline data.
///
/// # Example
/// ```rust,ignore
/// let event = event!(topics::PLAYER_TRACK_STARTED, {
///     "title" => json!("So What"),
///     "duration" => json!(562),
/// });
/// ```
#[macro_export]
macro_rules! event {
    ($topic:expr) => {
        $crate::prelude::Event::new($topic)
    };
    ($topic:expr, { $($key:expr => $value:expr),* $(,)? }) => {{
        let mut event = $crate::prelude::Event::new($topic);
        $(
            event.data.insert($key.to_string(), $value);
        )*
        event
    }};
    ($topic:expr, actor: $actor:expr, { $($key:expr => $value:expr),* $(,)? }) => {{
        let mut event = $crate::prelude::Event::new($topic).with_actor($actor);
        $(
            event.data.insert($key.to_string(), $value);
        )*
        event
    }};
}
