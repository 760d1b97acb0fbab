//! Catalog of compiled-in plugin modules.
//!
//! A manifest names the module that implements it; the catalog maps that
//! name to a factory producing a fresh plugin instance. Each load calls
//! the factory again, so a reload never reuses instance state.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use resonance_core::error::AppError;
use resonance_core::result::AppResult;

use crate::traits::Plugin;

/// Produces a new plugin instance.
pub type PluginFactory = Arc<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

/// Module name → factory.
#[derive(Default)]
pub struct PluginCatalog {
    factories: HashMap<String, PluginFactory>,
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("modules", &self.modules())
            .finish()
    }
}

impl PluginCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module. Fails with `DuplicateName` if it is already present.
    pub fn register<F>(&mut self, module: &str, factory: F) -> AppResult<()>
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        if self.factories.contains_key(module) {
            return Err(AppError::duplicate_name(format!(
                "Plugin module '{module}' is already in the catalog"
            )));
        }
        self.factories.insert(module.to_string(), Arc::new(factory));
        info!(module = %module, "Plugin module registered");
        Ok(())
    }

    /// Creates a new instance of `module`.
    pub fn instantiate(&self, module: &str) -> AppResult<Arc<dyn Plugin>> {
        let factory = self
            .factories
            .get(module)
            .ok_or_else(|| AppError::not_found(format!("No plugin module named '{module}'")))?;
        Ok(factory())
    }

    /// Whether `module` is known.
    pub fn contains(&self, module: &str) -> bool {
        self.factories.contains_key(module)
    }

    /// Known module names, sorted.
    pub fn modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self.factories.keys().cloned().collect();
        modules.sort();
        modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use resonance_core::ErrorKind;

    use crate::api::context::PluginContext;

    struct Noop;

    #[async_trait]
    impl Plugin for Noop {
        async fn setup(&self, _ctx: &PluginContext) -> AppResult<()> {
            Ok(())
        }

        async fn teardown(&self, _ctx: &PluginContext) -> AppResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_instantiate() {
        let mut catalog = PluginCatalog::new();
        catalog.register("noop", || Arc::new(Noop)).unwrap();

        assert!(catalog.contains("noop"));
        assert!(catalog.instantiate("noop").is_ok());
        assert_eq!(catalog.modules(), vec!["noop".to_string()]);
    }

    #[test]
    fn test_duplicate_and_missing_modules() {
        let mut catalog = PluginCatalog::new();
        catalog.register("noop", || Arc::new(Noop)).unwrap();

        let dup = catalog.register("noop", || Arc::new(Noop)).unwrap_err();
        assert!(dup.is(ErrorKind::DuplicateName));

        let missing = catalog.instantiate("ghost").err().unwrap();
        assert!(missing.is(ErrorKind::NotFound));
    }
}
