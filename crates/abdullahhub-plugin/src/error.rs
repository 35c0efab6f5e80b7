//! Errors raised while loading or running plugins.

use abdullahhub_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Plugin loading and invocation failures.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No plugin is loaded under this slug.
    #[error("Plugin not loaded: {0}")]
    NotLoaded(String),

    /// The plugin directory does not exist.
    #[error("Plugin directory not found: {0}")]
    DirectoryMissing(String),

    /// `plugin.json` is missing or malformed.
    #[error("Invalid plugin manifest: {0}")]
    InvalidManifest(String),

    /// A builtin runtime names a factory that was never registered.
    #[error("No builtin implementation registered for '{0}'")]
    UnknownBuiltin(String),

    /// The plugin's entry point raised.
    #[error("{0}")]
    Raised(String),

    /// Output was not a JSON object.
    #[error("Plugin returned invalid output: {0}")]
    InvalidOutput(String),

    /// Filesystem or process error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::NotLoaded(_) | PluginError::DirectoryMissing(_) => {
                AppError::not_found(err.to_string())
            }
            PluginError::InvalidManifest(_) | PluginError::UnknownBuiltin(_) => {
                AppError::validation(err.to_string())
            }
            other => AppError::with_source(ErrorKind::Plugin, other.to_string(), other),
        }
    }
}
