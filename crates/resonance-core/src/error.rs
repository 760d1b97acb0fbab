//! Unified application error types for Resonance.
//!
//! Registry, event bus, plugin lifecycle, and plugin code all map their
//! failures into [`AppError`] so they propagate through the `?` operator
//! and can be matched on by [`ErrorKind`].

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested command, node, or plugin was not found.
    NotFound,
    /// A command name or menu node id is already registered.
    DuplicateName,
    /// A menu node referenced a parent that does not exist.
    UnknownParent,
    /// A plugin context was used after its plugin was torn down.
    ContextClosed,
    /// A plugin's `setup` hook failed.
    PluginSetup,
    /// A plugin's `teardown` hook failed.
    PluginTeardown,
    /// A command handler failed while serving a request.
    CommandFailed,
    /// Input validation failed.
    Validation,
    /// A plugin manifest is missing, malformed, or invalid.
    InvalidManifest,
    /// A configuration error occurred.
    Configuration,
    /// An internal error occurred.
    Internal,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A filesystem I/O error occurred.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::DuplicateName => write!(f, "DUPLICATE_NAME"),
            Self::UnknownParent => write!(f, "UNKNOWN_PARENT"),
            Self::ContextClosed => write!(f, "CONTEXT_CLOSED"),
            Self::PluginSetup => write!(f, "PLUGIN_SETUP"),
            Self::PluginTeardown => write!(f, "PLUGIN_TEARDOWN"),
            Self::CommandFailed => write!(f, "COMMAND_FAILED"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::InvalidManifest => write!(f, "INVALID_MANIFEST"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Storage => write!(f, "STORAGE"),
        }
    }
}

/// The unified application error used throughout Resonance.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a duplicate-name error.
    pub fn duplicate_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateName, message)
    }

    /// Create an unknown-parent error.
    pub fn unknown_parent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownParent, message)
    }

    /// Create a context-closed error.
    pub fn context_closed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContextClosed, message)
    }

    /// Create a plugin setup error wrapping the plugin's own failure.
    pub fn plugin_setup(plugin: &str, cause: AppError) -> Self {
        Self::with_source(
            ErrorKind::PluginSetup,
            format!("Plugin '{plugin}' setup failed: {}", cause.message),
            cause,
        )
    }

    /// Create a plugin teardown error wrapping the plugin's own failure.
    pub fn plugin_teardown(plugin: &str, cause: AppError) -> Self {
        Self::with_source(
            ErrorKind::PluginTeardown,
            format!("Plugin '{plugin}' teardown failed: {}", cause.message),
            cause,
        )
    }

    /// Create a command-failed error.
    pub fn command_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CommandFailed, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an invalid-manifest error.
    pub fn invalid_manifest(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidManifest, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::duplicate_name("Command 'x' is already registered");
        assert_eq!(
            err.to_string(),
            "DUPLICATE_NAME: Command 'x' is already registered"
        );
    }

    #[test]
    fn test_plugin_setup_wraps_cause() {
        let cause = AppError::internal("boom");
        let err = AppError::plugin_setup("example", cause);
        assert!(err.is(ErrorKind::PluginSetup));
        assert!(err.message.contains("boom"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_clone_drops_source() {
        let err = AppError::plugin_teardown("example", AppError::internal("x"));
        let cloned = err.clone();
        assert_eq!(cloned.kind, ErrorKind::PluginTeardown);
        assert!(cloned.source.is_none());
    }
}
