//! # plugin-removebg
//!
//! Background removal through the remove.bg API, bundled with AbdullahHub
//! as the builtin plugin `removebg`.
//!
//! The caller's stored key is used when present; otherwise the server-wide
//! `REMOVEBG_API_KEY` is the fallback.

pub mod client;
pub mod error;
pub mod plugin;

use std::path::Path;
use std::sync::Arc;

use abdullahhub_core::config::RemoveBgConfig;
use abdullahhub_plugin::{BuiltinFactory, Plugin, PluginError, PluginManifest};

pub use client::{RemovalOptions, RemoveBgClient, RemovedBackground};
pub use error::RemoveBgError;
pub use plugin::{ImageSource, RemoveBgPlugin};

/// Directory name and identifier of the plugin.
pub const SLUG: &str = "removebg";

/// Factory registering this plugin with a loader.
pub fn factory(config: RemoveBgConfig) -> BuiltinFactory {
    Arc::new(move |_manifest: &PluginManifest, _dir: &Path| {
        let client =
            RemoveBgClient::new(&config).map_err(|e| PluginError::Raised(e.to_string()))?;
        let fallback = Some(config.api_key.clone());
        Ok(Arc::new(RemoveBgPlugin::new(client, fallback)) as Arc<dyn Plugin>)
    })
}
