//! Plugin manager: lifecycle of every plugin the host knows about.
//!
//! ```text
//! DISCOVERED ──▶ LOADING ──▶ RUNNING ──▶ TEARING_DOWN ──▶ UNLOADED
//!                   │    ▲                     │              │
//!                   │    └─────────────────────┼──────────────┘
//!                   └────────▶ FAILED ◀────────┘
//! ```
//!
//! `FAILED` is terminal: a failed plugin stays failed until the host
//! restarts.
//!
//! Leaving `LOADING` for `FAILED` or leaving `TEARING_DOWN` always revokes
//! every registry entry and subscription owned by the instance. Lifecycle
//! operations are serialized; command dispatch and event delivery are not
//! blocked by them except while an instance's entries are being revoked.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use resonance_core::config::PluginConfig;
use resonance_core::error::AppError;
use resonance_core::events::{Event, topics};
use resonance_core::result::AppResult;
use resonance_core::types::PluginId;

use crate::api::context::PluginContext;
use crate::api::session::PluginSession;
use crate::catalog::PluginCatalog;
use crate::events::bus::EventBus;
use crate::guard::guarded;
use crate::manifest::{self, PluginManifest};
use crate::registry::Registry;
use crate::registry::commands::CommandContext;
use crate::registry::dispatcher::CommandDispatcher;
use crate::traits::Plugin;

/// Lifecycle state of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Manifest known, nothing loaded.
    Discovered,
    /// Setup in progress.
    Loading,
    /// Setup succeeded; the instance is live.
    Running,
    /// Teardown in progress.
    TearingDown,
    /// Torn down cleanly. May be loaded again.
    Unloaded,
    /// Setup or teardown failed. Terminal.
    Failed,
}

impl PluginState {
    /// Returns the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Loading => "loading",
            Self::Running => "running",
            Self::TearingDown => "tearing_down",
            Self::Unloaded => "unloaded",
            Self::Failed => "failed",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use PluginState::*;
        matches!(
            (self, next),
            (Discovered | Unloaded, Loading)
                | (Loading, Running | Failed)
                | (Running, TearingDown)
                | (TearingDown, Unloaded | Failed)
        )
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one plugin for listing and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    /// Plugin name.
    pub name: String,
    /// Plugin version.
    pub version: String,
    /// Short description.
    pub description: String,
    /// Author or maintainer.
    pub author: String,
    /// Catalog module.
    pub module: String,
    /// Current state.
    pub state: PluginState,
    /// Identity of the current or most recent instance.
    pub plugin_id: Option<PluginId>,
    /// Private data directory, once assigned.
    pub data_dir: Option<PathBuf>,
    /// When the running instance finished setup.
    pub loaded_at: Option<DateTime<Utc>>,
    /// Error from the most recent failed transition.
    pub last_error: Option<String>,
    /// Commands owned by the running instance.
    pub commands: Vec<String>,
    /// Menu nodes owned by the running instance.
    pub menu_nodes: Vec<String>,
    /// Subscriptions held by the running instance.
    pub subscriptions: usize,
}

/// Outcome of a batch lifecycle operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LifecycleReport {
    /// Plugins the operation succeeded for, in order.
    pub succeeded: Vec<String>,
    /// Plugins it failed for, with the error message.
    pub failed: Vec<(String, String)>,
    /// Plugins that were skipped, e.g. because they are disabled.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone)]
struct PluginRecord {
    manifest: PluginManifest,
    state: PluginState,
    plugin_id: Option<PluginId>,
    data_dir: Option<PathBuf>,
    loaded_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl PluginRecord {
    fn new(manifest: PluginManifest) -> Self {
        Self {
            manifest,
            state: PluginState::Discovered,
            plugin_id: None,
            data_dir: None,
            loaded_at: None,
            last_error: None,
        }
    }
}

/// Owns the registry, the event bus, and every plugin instance.
///
/// Lock order: `lifecycle`, then `records` or `sessions` (never both held).
pub struct PluginManager {
    config: PluginConfig,
    handler_timeout: Duration,
    registry: Arc<Registry>,
    bus: Arc<EventBus>,
    dispatcher: CommandDispatcher,
    catalog: RwLock<PluginCatalog>,
    records: RwLock<Vec<PluginRecord>>,
    /// Running instances in load order.
    sessions: Mutex<Vec<PluginSession>>,
    lifecycle: Mutex<()>,
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl PluginManager {
    /// Creates a manager with an empty registry, bus, and catalog.
    pub fn new(config: PluginConfig) -> Self {
        let handler_timeout = Duration::from_secs(config.handler_timeout_seconds.max(1));
        let registry = Arc::new(Registry::new(config.menu_roots.clone()));
        let bus = Arc::new(EventBus::new().with_handler_timeout(handler_timeout));
        let dispatcher =
            CommandDispatcher::new(registry.clone()).with_handler_timeout(handler_timeout);

        Self {
            config,
            handler_timeout,
            registry,
            bus,
            dispatcher,
            catalog: RwLock::new(PluginCatalog::new()),
            records: RwLock::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
            lifecycle: Mutex::new(()),
        }
    }

    /// The plugin configuration this manager was built with.
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// The shared command and menu registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The shared event bus.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The command dispatcher.
    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Adds a compiled-in plugin module to the catalog.
    pub async fn register_module<F>(&self, module: &str, factory: F) -> AppResult<()>
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        self.catalog.write().await.register(module, factory)
    }

    /// Adds a plugin by manifest, in state `Discovered`.
    pub async fn add_manifest(&self, manifest: PluginManifest) -> AppResult<()> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.manifest.name == manifest.name) {
            return Err(AppError::duplicate_name(format!(
                "Plugin '{}' is already known",
                manifest.name
            )));
        }
        info!(plugin = %manifest.name, version = %manifest.version, "Plugin discovered");
        records.push(PluginRecord::new(manifest));
        Ok(())
    }

    /// Scans the plugin directory and adds any manifests not yet known.
    ///
    /// Returns the number of newly discovered plugins.
    pub async fn discover(&self) -> AppResult<usize> {
        let dir = PathBuf::from(&self.config.directory);
        let mut added = 0;
        for manifest in manifest::discover(&dir).await? {
            let name = manifest.name.clone();
            match self.add_manifest(manifest).await {
                Ok(()) => added += 1,
                Err(e) => warn!(plugin = %name, error = %e, "Ignoring duplicate plugin manifest"),
            }
        }
        Ok(added)
    }

    /// Loads one plugin: validate, instantiate, create its data directory,
    /// then run its setup. Returns the new instance id.
    pub async fn load(&self, name: &str) -> AppResult<PluginId> {
        let _lifecycle = self.lifecycle.lock().await;
        self.load_locked(name).await
    }

    /// Loads every discovered plugin that is not disabled.
    ///
    /// One plugin failing does not stop the others from loading.
    pub async fn load_all(&self) -> LifecycleReport {
        let _lifecycle = self.lifecycle.lock().await;

        let candidates: Vec<PluginManifest> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.state == PluginState::Discovered)
            .map(|r| r.manifest.clone())
            .collect();

        let mut report = LifecycleReport::default();
        for manifest in candidates {
            if !self.is_enabled(&manifest) {
                info!(plugin = %manifest.name, "Plugin disabled, skipping");
                report.skipped.push(manifest.name);
                continue;
            }
            match self.load_locked(&manifest.name).await {
                Ok(_) => report.succeeded.push(manifest.name),
                Err(e) => report.failed.push((manifest.name, e.to_string())),
            }
        }

        info!(
            loaded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Plugin loading complete"
        );
        report
    }

    /// Tears down one running plugin and revokes everything it owns.
    ///
    /// A failing teardown leaves the plugin `Failed`, but its entries are
    /// still revoked.
    pub async fn unload(&self, name: &str) -> AppResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        self.unload_locked(name).await
    }

    /// Unloads a running plugin if needed, then loads a fresh instance.
    ///
    /// The new instance gets a new id and the same data directory. A
    /// `Failed` plugin cannot be reloaded.
    pub async fn reload(&self, name: &str) -> AppResult<PluginId> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.state(name).await == Some(PluginState::Running) {
            self.unload_locked(name).await?;
        }
        self.load_locked(name).await
    }

    /// Tears down every running plugin in reverse load order.
    pub async fn shutdown(&self) -> LifecycleReport {
        let _lifecycle = self.lifecycle.lock().await;

        let names: Vec<String> = self
            .sessions
            .lock()
            .await
            .iter()
            .rev()
            .map(|s| s.name().to_string())
            .collect();

        let mut report = LifecycleReport::default();
        for name in names {
            match self.unload_locked(&name).await {
                Ok(()) => report.succeeded.push(name),
                Err(e) => report.failed.push((name, e.to_string())),
            }
        }

        info!(
            unloaded = report.succeeded.len(),
            failed = report.failed.len(),
            "All plugins unloaded"
        );
        report
    }

    /// Like [`shutdown`](Self::shutdown), but stops waiting after `grace`.
    ///
    /// On timeout every plugin still running or mid-teardown is logged and
    /// reported as failed; plugins already torn down are not listed.
    pub async fn shutdown_within(&self, grace: Duration) -> LifecycleReport {
        match tokio::time::timeout(grace, self.shutdown()).await {
            Ok(report) => report,
            Err(_) => {
                let pending: Vec<String> = self
                    .records
                    .read()
                    .await
                    .iter()
                    .filter(|r| matches!(r.state, PluginState::Running | PluginState::TearingDown))
                    .map(|r| r.manifest.name.clone())
                    .collect();

                warn!(
                    grace_ms = grace.as_millis() as u64,
                    pending = ?pending,
                    "Plugin shutdown exceeded grace period"
                );

                LifecycleReport {
                    failed: pending
                        .into_iter()
                        .map(|name| (name, "Not torn down within the grace period".to_string()))
                        .collect(),
                    ..LifecycleReport::default()
                }
            }
        }
    }

    /// Dispatches a command request.
    pub async fn dispatch(&self, ctx: &CommandContext, command: &[Value]) -> AppResult<Value> {
        self.dispatcher.dispatch(ctx, command).await
    }

    /// Publishes an event to all subscribers.
    pub async fn publish(&self, event: &Event) {
        self.bus.publish(event).await;
    }

    /// Current state of a plugin.
    pub async fn state(&self, name: &str) -> Option<PluginState> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.manifest.name == name)
            .map(|r| r.state)
    }

    /// Names of running plugins in load order.
    pub async fn running(&self) -> Vec<String> {
        self.sessions
            .lock()
            .await
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Snapshot of one plugin.
    pub async fn info(&self, name: &str) -> Option<PluginInfo> {
        let record = self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.manifest.name == name)
            .cloned()?;
        Some(self.describe(record).await)
    }

    /// Snapshot of every known plugin, in discovery order.
    pub async fn list(&self) -> Vec<PluginInfo> {
        let records = self.records.read().await.clone();
        let mut infos = Vec::with_capacity(records.len());
        for record in records {
            infos.push(self.describe(record).await);
        }
        infos
    }

    async fn describe(&self, record: PluginRecord) -> PluginInfo {
        let context = self
            .sessions
            .lock()
            .await
            .iter()
            .find(|s| s.name() == record.manifest.name)
            .map(|s| s.context.clone());

        let (commands, menu_nodes, subscriptions) = match context {
            Some(ctx) => (
                ctx.registered_commands().await,
                ctx.registered_menu_nodes().await,
                ctx.subscription_count().await,
            ),
            None => (Vec::new(), Vec::new(), 0),
        };

        PluginInfo {
            module: record.manifest.module().to_string(),
            name: record.manifest.name,
            version: record.manifest.version,
            description: record.manifest.description,
            author: record.manifest.author,
            state: record.state,
            plugin_id: record.plugin_id,
            data_dir: record.data_dir,
            loaded_at: record.loaded_at,
            last_error: record.last_error,
            commands,
            menu_nodes,
            subscriptions,
        }
    }

    fn is_enabled(&self, manifest: &PluginManifest) -> bool {
        manifest.enabled && !self.config.is_disabled(&manifest.name)
    }

    /// Moves a plugin to `next`, returning its manifest.
    async fn transition(&self, name: &str, next: PluginState) -> AppResult<PluginManifest> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.manifest.name == name)
            .ok_or_else(|| AppError::not_found(format!("Unknown plugin '{name}'")))?;

        if !record.state.can_transition_to(next) {
            return Err(AppError::validation(format!(
                "Plugin '{name}' is {} and cannot become {next}",
                record.state
            )));
        }

        record.state = next;
        Ok(record.manifest.clone())
    }

    async fn update<F>(&self, name: &str, f: F)
    where
        F: FnOnce(&mut PluginRecord),
    {
        if let Some(record) = self
            .records
            .write()
            .await
            .iter_mut()
            .find(|r| r.manifest.name == name)
        {
            f(record);
        }
    }

    async fn mark_failed(&self, name: &str, err: &AppError) {
        self.update(name, |r| {
            r.state = PluginState::Failed;
            r.loaded_at = None;
            r.last_error = Some(err.to_string());
        })
        .await;
    }

    async fn load_locked(&self, name: &str) -> AppResult<PluginId> {
        {
            let records = self.records.read().await;
            let record = records
                .iter()
                .find(|r| r.manifest.name == name)
                .ok_or_else(|| AppError::not_found(format!("Unknown plugin '{name}'")))?;
            if !self.is_enabled(&record.manifest) {
                return Err(AppError::validation(format!("Plugin '{name}' is disabled")));
            }
        }

        let manifest = self.transition(name, PluginState::Loading).await?;
        info!(plugin = %name, version = %manifest.version, "Loading plugin");

        let (plugin, data_dir) = match self.prepare(&manifest).await {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(plugin = %name, error = %e, "Plugin could not be prepared");
                self.mark_failed(name, &e).await;
                return Err(e);
            }
        };

        let plugin_id = PluginId::new();
        let context = PluginContext::new(
            plugin_id,
            &manifest.name,
            &manifest.version,
            data_dir.clone(),
            self.registry.clone(),
            self.bus.clone(),
        );
        self.update(name, |r| {
            r.plugin_id = Some(plugin_id);
            r.data_dir = Some(data_dir);
        })
        .await;

        if let Err(failure) = guarded(self.handler_timeout, plugin.setup(&context)).await {
            let report = context.revoke().await;
            let err = AppError::plugin_setup(name, failure.into_error());
            error!(
                plugin = %name,
                plugin_id = %plugin_id,
                revoked = report.total(),
                error = %err,
                "Plugin setup failed"
            );
            self.mark_failed(name, &err).await;
            return Err(err);
        }

        self.transition(name, PluginState::Running).await?;
        self.update(name, |r| {
            r.loaded_at = Some(Utc::now());
            r.last_error = None;
        })
        .await;

        let commands = context.registered_commands().await.len();
        let menu_nodes = context.registered_menu_nodes().await.len();
        let subscriptions = context.subscription_count().await;
        self.sessions
            .lock()
            .await
            .push(PluginSession::new(plugin, context));

        info!(
            plugin = %name,
            plugin_id = %plugin_id,
            version = %manifest.version,
            commands,
            menu_nodes,
            subscriptions,
            "Plugin loaded"
        );

        self.bus
            .publish(
                &Event::new(topics::PLUGIN_LOADED)
                    .with_string("plugin", name)
                    .with_string("version", &manifest.version),
            )
            .await;

        Ok(plugin_id)
    }

    /// Validates the manifest, instantiates the module, and creates the data directory.
    async fn prepare(&self, manifest: &PluginManifest) -> AppResult<(Arc<dyn Plugin>, PathBuf)> {
        manifest.check()?;
        let plugin = self.catalog.read().await.instantiate(manifest.module())?;

        let data_dir = PathBuf::from(&self.config.data_directory).join(&manifest.name);
        tokio::fs::create_dir_all(&data_dir).await.map_err(|e| {
            AppError::storage(format!(
                "Failed to create data directory '{}': {e}",
                data_dir.display()
            ))
        })?;

        Ok((plugin, data_dir))
    }

    async fn unload_locked(&self, name: &str) -> AppResult<()> {
        self.transition(name, PluginState::TearingDown).await?;

        let session = {
            let mut sessions = self.sessions.lock().await;
            let index = sessions
                .iter()
                .position(|s| s.name() == name)
                .ok_or_else(|| AppError::internal(format!("No live session for plugin '{name}'")))?;
            sessions.remove(index)
        };

        let plugin_id = session.plugin_id();
        info!(plugin = %name, plugin_id = %plugin_id, "Unloading plugin");

        let teardown = guarded(self.handler_timeout, session.plugin.teardown(&session.context)).await;
        let report = session.context.revoke().await;
        let uptime = Utc::now() - session.loaded_at;
        drop(session);

        let result = match teardown {
            Ok(()) => {
                self.transition(name, PluginState::Unloaded).await?;
                self.update(name, |r| r.loaded_at = None).await;
                info!(
                    plugin = %name,
                    plugin_id = %plugin_id,
                    revoked = report.total(),
                    uptime_seconds = uptime.num_seconds(),
                    "Plugin unloaded"
                );
                Ok(())
            }
            Err(failure) => {
                let err = AppError::plugin_teardown(name, failure.into_error());
                error!(
                    plugin = %name,
                    plugin_id = %plugin_id,
                    revoked = report.total(),
                    error = %err,
                    "Plugin teardown failed"
                );
                self.mark_failed(name, &err).await;
                Err(err)
            }
        };

        self.bus
            .publish(&Event::new(topics::PLUGIN_UNLOADED).with_string("plugin", name))
            .await;

        result
    }
}
