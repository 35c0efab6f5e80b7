//! Plugin discovery and loading from the plugin directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::PluginError;
use crate::manifest::{MANIFEST_FILE, PluginManifest, RuntimeKind, is_valid_slug};
use crate::process::CommandPlugin;
use crate::registry::{LoadedPlugin, LoadedPluginInfo, PluginRegistry};
use crate::traits::Plugin;

/// Builds a builtin plugin from its manifest and directory.
pub type BuiltinFactory =
    Arc<dyn Fn(&PluginManifest, &Path) -> Result<Arc<dyn Plugin>, PluginError> + Send + Sync>;

/// Loads plugins from `<directory>/<slug>/plugin.json` into a registry.
#[derive(Clone)]
pub struct PluginLoader {
    directory: PathBuf,
    registry: Arc<PluginRegistry>,
    builtins: HashMap<String, BuiltinFactory>,
    max_output_bytes: usize,
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut builtins: Vec<&String> = self.builtins.keys().collect();
        builtins.sort();
        f.debug_struct("PluginLoader")
            .field("directory", &self.directory)
            .field("builtins", &builtins)
            .field("max_output_bytes", &self.max_output_bytes)
            .finish()
    }
}

impl PluginLoader {
    /// Create a loader for `directory`.
    pub fn new(
        directory: impl Into<PathBuf>,
        registry: Arc<PluginRegistry>,
        max_output_bytes: usize,
    ) -> Self {
        Self {
            directory: directory.into(),
            registry,
            builtins: HashMap::new(),
            max_output_bytes,
        }
    }

    /// Register the factory used for the builtin plugin `slug`.
    pub fn with_builtin(mut self, slug: &str, factory: BuiltinFactory) -> Self {
        self.builtins.insert(slug.to_string(), factory);
        self
    }

    /// The plugin root.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The registry plugins are loaded into.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Directory of the plugin `slug`.
    pub fn plugin_dir(&self, slug: &str) -> Result<PathBuf, PluginError> {
        if !is_valid_slug(slug) {
            return Err(PluginError::InvalidManifest(format!(
                "invalid plugin identifier '{slug}'"
            )));
        }
        Ok(self.directory.join(slug))
    }

    /// Load every sub-directory that has a manifest. Failures are logged and
    /// skipped. Returns the number of plugins loaded.
    pub async fn load_all(&self) -> Result<usize, PluginError> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        let mut loaded = 0usize;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(slug) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !entry.path().join(MANIFEST_FILE).is_file() {
                continue;
            }
            match self.load(&slug).await {
                Ok(_) => loaded += 1,
                Err(e) => warn!(plugin = %slug, error = %e, "Failed to load plugin"),
            }
        }

        info!(count = loaded, directory = %self.directory.display(), "Plugins loaded");
        Ok(loaded)
    }

    /// Load (or reload) one plugin.
    pub async fn load(&self, slug: &str) -> Result<LoadedPluginInfo, PluginError> {
        let dir = self.plugin_dir(slug)?;
        if !dir.is_dir() {
            return Err(PluginError::DirectoryMissing(dir.display().to_string()));
        }

        let manifest = PluginManifest::from_dir(&dir, slug).await?;
        manifest.validate()?;

        let plugin: Arc<dyn Plugin> = match manifest.runtime {
            RuntimeKind::Builtin => {
                let factory = self
                    .builtins
                    .get(slug)
                    .ok_or_else(|| PluginError::UnknownBuiltin(slug.to_string()))?;
                factory(&manifest, &dir)?
            }
            RuntimeKind::Command => {
                let entry = manifest.entry.clone().unwrap_or_default();
                Arc::new(CommandPlugin::new(slug, &dir, entry, self.max_output_bytes))
            }
        };

        self.registry
            .insert(
                slug,
                LoadedPlugin {
                    plugin,
                    manifest,
                    directory: dir,
                    loaded_at: Utc::now(),
                },
            )
            .await;

        self.registry
            .info(slug)
            .await
            .ok_or_else(|| PluginError::NotLoaded(slug.to_string()))
    }

    /// Load `slug` unless it is already registered.
    pub async fn ensure_loaded(&self, slug: &str) -> Result<LoadedPluginInfo, PluginError> {
        match self.registry.info(slug).await {
            Some(info) => Ok(info),
            None => self.load(slug).await,
        }
    }

    /// Remove a plugin from the registry. Returns whether it was loaded.
    pub async fn unload(&self, slug: &str) -> bool {
        self.registry.remove(slug).await
    }

    /// Summaries of loaded plugins.
    pub async fn list(&self) -> Vec<LoadedPluginInfo> {
        self.registry.list().await
    }

    /// Summary of one loaded plugin.
    pub async fn info(&self, slug: &str) -> Option<LoadedPluginInfo> {
        self.registry.info(slug).await
    }
}
