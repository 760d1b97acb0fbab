//! Plugin manifests and on-disk discovery.
//!
//! Each plugin lives in its own directory under the configured plugin
//! directory and describes itself in a `plugin.toml`:
//!
//! ```toml
//! name = "example"
//! version = "0.1.0"
//! description = "Demonstrates the plugin API"
//! author = "Resonance Team"
//! module = "example"
//! enabled = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use validator::{Validate, ValidationError};

use resonance_core::error::AppError;
use resonance_core::result::AppResult;

/// File name of a plugin manifest inside its directory.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Static description of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PluginManifest {
    /// Unique plugin name; also names the plugin's data directory.
    #[validate(length(min = 1, max = 64), custom(function = "validate_plugin_name"))]
    pub name: String,
    /// Plugin version string.
    #[validate(length(min = 1, max = 32))]
    pub version: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Author or maintainer.
    #[serde(default)]
    pub author: String,
    /// Catalog module implementing the plugin. Defaults to `name`.
    #[serde(default)]
    pub module: Option<String>,
    /// Whether the plugin should be loaded at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Directory the manifest was read from, if any.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl PluginManifest {
    /// Creates an enabled manifest with no description.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: String::new(),
            module: None,
            enabled: true,
            path: None,
        }
    }

    /// The catalog module that provides this plugin.
    pub fn module(&self) -> &str {
        self.module.as_deref().unwrap_or(&self.name)
    }

    /// Reads and parses a manifest file without validating it.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .build()
            .map_err(|e| {
                AppError::invalid_manifest(format!("Failed to read '{}': {e}", path.display()))
            })?;

        let mut manifest: Self = config.try_deserialize().map_err(|e| {
            AppError::invalid_manifest(format!("Failed to parse '{}': {e}", path.display()))
        })?;
        manifest.path = path.parent().map(Path::to_path_buf);
        Ok(manifest)
    }

    /// Validates field constraints.
    pub fn check(&self) -> AppResult<()> {
        self.validate().map_err(|e| {
            AppError::invalid_manifest(format!("Manifest for '{}' is invalid: {e}", self.name))
        })
    }
}

fn default_enabled() -> bool {
    true
}

/// Plugin names double as directory names, so path separators and dots
/// leading to traversal are not allowed.
fn validate_plugin_name(name: &str) -> Result<(), ValidationError> {
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("plugin_name"))
    }
}

/// Scans `dir` for `<plugin>/plugin.toml` manifests, sorted by directory name.
///
/// A missing directory yields no plugins. Unreadable manifests are logged
/// and skipped; validation happens later, when a plugin is loaded.
pub async fn discover(dir: &Path) -> AppResult<Vec<PluginManifest>> {
    if !tokio::fs::try_exists(dir).await? {
        debug!(dir = %dir.display(), "Plugin directory does not exist");
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            let manifest = entry.path().join(MANIFEST_FILE);
            if tokio::fs::try_exists(&manifest).await? {
                candidates.push(manifest);
            }
        }
    }
    candidates.sort();

    let mut manifests = Vec::with_capacity(candidates.len());
    for path in candidates {
        match PluginManifest::from_file(&path) {
            Ok(manifest) => {
                debug!(plugin = %manifest.name, path = %path.display(), "Plugin discovered");
                manifests.push(manifest);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable plugin manifest");
            }
        }
    }

    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use super::*;

    use resonance_core::ErrorKind;

    fn write_manifest(root: &Path, dir: &str, body: &str) {
        let plugin_dir = root.join(dir);
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join(MANIFEST_FILE), body).unwrap();
    }

    #[tokio::test]
    async fn test_discover_reads_sorted_manifests() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "zeta", "name = \"zeta\"\nversion = \"1.0.0\"\n");
        write_manifest(
            dir.path(),
            "alpha",
            "name = \"alpha\"\nversion = \"0.2.0\"\nmodule = \"builtin-alpha\"\nenabled = false\n",
        );
        write_manifest(dir.path(), "broken", "name = [\n");
        std::fs::create_dir_all(dir.path().join("no-manifest")).unwrap();

        let manifests = discover(dir.path()).await.unwrap();
        let names: Vec<_> = manifests.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        assert_eq!(manifests[0].module(), "builtin-alpha");
        assert!(!manifests[0].enabled);
        assert_eq!(manifests[1].module(), "zeta");
        assert!(manifests[1].enabled);
        assert_eq!(manifests[1].path.as_deref(), Some(dir.path().join("zeta").as_path()));
    }

    #[tokio::test]
    async fn test_discover_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifests = discover(&dir.path().join("absent")).await.unwrap();
        assert!(manifests.is_empty());
    }

    #[test]
    fn test_check_rejects_unsafe_names() {
        for name in ["", "../escape", "a/b", ".hidden"] {
            let err = PluginManifest::new(name, "1.0.0").check().unwrap_err();
            assert!(err.is(ErrorKind::InvalidManifest), "name {name:?} accepted");
        }
        assert!(PluginManifest::new("now-playing_2", "1.0.0").check().is_ok());
    }

    #[test]
    fn test_check_rejects_empty_version() {
        let err = PluginManifest::new("ok", "").check().unwrap_err();
        assert!(err.is(ErrorKind::InvalidManifest));
    }
}
