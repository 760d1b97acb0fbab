//! The example plugin running inside a real plugin manager.

use resonance_core::config::PluginConfig;
use resonance_plugin::PluginManager;
use resonance_plugin::prelude::*;

use plugin_example::plugin::{HELLO_COMMAND, LifetimeStats, MENU_NODE_ID, STATS_FILE};

async fn manager(root: &std::path::Path) -> PluginManager {
    let manager = PluginManager::new(PluginConfig {
        directory: root.join("plugins").display().to_string(),
        data_directory: root.join("data").display().to_string(),
        ..PluginConfig::default()
    });
    plugin_example::register(&manager).await.unwrap();
    manager.add_manifest(plugin_example::manifest()).await.unwrap();
    manager
}

async fn hello(manager: &PluginManager) -> Value {
    manager
        .dispatch(&CommandContext::new(), &[json!(HELLO_COMMAND)])
        .await
        .unwrap()
}

#[tokio::test]
async fn test_bundled_manifest_added_only_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let manager = PluginManager::new(PluginConfig {
        directory: dir.path().join("plugins").display().to_string(),
        data_directory: dir.path().join("data").display().to_string(),
        ..PluginConfig::default()
    });

    assert!(plugin_example::add_manifest_if_missing(&manager).await.unwrap());
    assert!(!plugin_example::add_manifest_if_missing(&manager).await.unwrap());
    let info = manager.info(&plugin_example::manifest().name).await.unwrap();
    assert_eq!(info.version, plugin_example::VERSION);
}

#[tokio::test]
async fn test_discovered_manifest_wins_over_bundled() {
    let dir = tempfile::tempdir().unwrap();
    let plugins = dir.path().join("plugins");
    std::fs::create_dir_all(plugins.join("example")).unwrap();
    std::fs::write(
        plugins.join("example").join("plugin.toml"),
        "name = \"example\"\nversion = \"9.9.9\"\nmodule = \"example\"\n",
    )
    .unwrap();

    let manager = PluginManager::new(PluginConfig {
        directory: plugins.display().to_string(),
        data_directory: dir.path().join("data").display().to_string(),
        ..PluginConfig::default()
    });
    assert_eq!(manager.discover().await.unwrap(), 1);

    assert!(!plugin_example::add_manifest_if_missing(&manager).await.unwrap());
    assert_eq!(manager.info("example").await.unwrap().version, "9.9.9");
}

#[tokio::test]
async fn test_track_counter_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path()).await;
    manager.load("example").await.unwrap();

    assert_eq!(hello(&manager).await["tracks_started"], 0);

    manager
        .publish(&event!(topics::PLAYER_TRACK_STARTED, {
            "title" => json!("Blue in Green"),
        }))
        .await;

    let result = hello(&manager).await;
    assert_eq!(result["tracks_started"], 1);
    assert_eq!(result["message"], "Hello from example plugin, World!");
    assert_eq!(result["version"], plugin_example::VERSION);
}

#[tokio::test]
async fn test_menu_node_under_home() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path()).await;
    manager.load("example").await.unwrap();

    let tree = manager.registry().menu_tree("home").await;
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, MENU_NODE_ID);
    assert_eq!(tree[0].text, "Example Plugin");
    assert_eq!(tree[0].weight, 1000);
}

#[tokio::test]
async fn test_unload_cleans_up_and_persists_stats() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path()).await;
    manager.load("example").await.unwrap();
    manager.publish(&Event::new(topics::PLAYER_TRACK_STARTED)).await;
    manager.publish(&Event::new(topics::PLAYER_TRACK_STARTED)).await;

    manager.unload("example").await.unwrap();

    assert_eq!(manager.registry().command_count().await, 0);
    assert_eq!(manager.registry().menu_node_count().await, 0);
    assert_eq!(manager.bus().subscription_count().await, 0);

    let stats_path = dir.path().join("data").join("example").join(STATS_FILE);
    let stats: LifetimeStats =
        serde_json::from_slice(&std::fs::read(&stats_path).unwrap()).unwrap();
    assert_eq!(
        stats,
        LifetimeStats {
            sessions: 1,
            tracks_started: 2
        }
    );
}

#[tokio::test]
async fn test_reload_resets_counter_and_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path()).await;
    manager.load("example").await.unwrap();
    manager.publish(&Event::new(topics::PLAYER_TRACK_STARTED)).await;
    assert_eq!(hello(&manager).await["tracks_started"], 1);

    manager.reload("example").await.unwrap();
    assert_eq!(hello(&manager).await["tracks_started"], 0);

    manager.publish(&Event::new(topics::PLAYER_TRACK_STARTED)).await;
    manager.shutdown().await;

    let stats_path = dir.path().join("data").join("example").join(STATS_FILE);
    let stats: LifetimeStats =
        serde_json::from_slice(&std::fs::read(&stats_path).unwrap()).unwrap();
    assert_eq!(stats.sessions, 2);
    assert_eq!(stats.tracks_started, 2);
}
