//! Plugin registry: loaded plugin instances keyed by slug.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::manifest::PluginManifest;
use crate::traits::Plugin;

/// Summary of a loaded plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedPluginInfo {
    /// Slug (directory name).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Version.
    pub version: String,
    /// Category.
    pub category: String,
    /// `builtin` or `command`.
    pub runtime: String,
    /// When the plugin was loaded.
    pub loaded_at: DateTime<Utc>,
}

/// A registered plugin with its manifest and location.
#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    /// The entry point.
    pub plugin: Arc<dyn Plugin>,
    /// Parsed manifest.
    pub manifest: PluginManifest,
    /// Plugin directory.
    pub directory: PathBuf,
    /// Load time.
    pub loaded_at: DateTime<Utc>,
}

impl LoadedPlugin {
    fn info(&self, slug: &str) -> LoadedPluginInfo {
        LoadedPluginInfo {
            id: slug.to_string(),
            name: self.manifest.name.clone(),
            description: self.manifest.description.clone(),
            version: self.manifest.version.clone(),
            category: self.manifest.category.clone(),
            runtime: self.manifest.runtime.as_str().to_string(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Registry of all loaded plugins.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, LoadedPlugin>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the plugin registered under `slug`.
    pub async fn insert(&self, slug: &str, loaded: LoadedPlugin) {
        info!(
            plugin = %slug,
            name = %loaded.manifest.name,
            version = %loaded.manifest.version,
            runtime = loaded.manifest.runtime.as_str(),
            "Registering plugin"
        );
        self.plugins.write().await.insert(slug.to_string(), loaded);
    }

    /// Remove a plugin. Returns whether it was registered.
    pub async fn remove(&self, slug: &str) -> bool {
        let removed = self.plugins.write().await.remove(slug).is_some();
        if removed {
            info!(plugin = %slug, "Plugin unregistered");
        }
        removed
    }

    /// Look up a plugin.
    pub async fn get(&self, slug: &str) -> Option<LoadedPlugin> {
        self.plugins.read().await.get(slug).cloned()
    }

    /// Whether a plugin is registered.
    pub async fn contains(&self, slug: &str) -> bool {
        self.plugins.read().await.contains_key(slug)
    }

    /// Summary of one plugin.
    pub async fn info(&self, slug: &str) -> Option<LoadedPluginInfo> {
        self.plugins.read().await.get(slug).map(|p| p.info(slug))
    }

    /// Summaries of all plugins, sorted by slug.
    pub async fn list(&self) -> Vec<LoadedPluginInfo> {
        let plugins = self.plugins.read().await;
        let mut infos: Vec<LoadedPluginInfo> =
            plugins.iter().map(|(slug, p)| p.info(slug)).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Loaded slugs with their manifests.
    pub async fn manifests(&self) -> Vec<(String, PluginManifest, PathBuf)> {
        let plugins = self.plugins.read().await;
        let mut out: Vec<_> = plugins
            .iter()
            .map(|(slug, p)| (slug.clone(), p.manifest.clone(), p.directory.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Number of loaded plugins.
    pub async fn count(&self) -> usize {
        self.plugins.read().await.len()
    }

    /// Drop every plugin.
    pub async fn clear(&self) {
        self.plugins.write().await.clear();
    }
}
