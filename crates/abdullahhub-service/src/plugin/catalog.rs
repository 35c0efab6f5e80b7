//! Catalog administration: moderation, package upload, and directory sync.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use abdullahhub_core::error::{AppError, ErrorKind};
use abdullahhub_core::types::PluginId;
use abdullahhub_database::repositories::{PluginRepository, UserRepository};
use abdullahhub_entity::plugin::{CreatePlugin, Plugin, PluginRuntime};
use abdullahhub_mail::{EmailTemplate, Mailer};
use abdullahhub_plugin::{
    AnalysisReport, PluginAnalyzer, PluginLoader, PluginManifest, RuntimeKind, requirements,
};

use crate::context::RequestContext;

/// Admin action on a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    /// Approve and activate.
    Approve,
    /// Withdraw approval and deactivate.
    Reject,
    /// Flip the active flag.
    Toggle,
    /// Archive.
    Delete,
}

impl FromStr for ModerationAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "toggle" => Ok(Self::Toggle),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::validation(format!(
                "Invalid action: '{s}'. Expected one of: approve, reject, toggle, delete"
            ))),
        }
    }
}

/// Outcome of an admin upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    /// The new catalog record.
    pub plugin: Plugin,
    /// What the analyzer found.
    pub analysis: AnalysisReport,
    /// Files written to the plugin directory.
    pub files: Vec<String>,
    /// Required executables not found on this host.
    pub missing_requirements: Vec<String>,
    /// Whether the plugin loaded.
    pub loaded: bool,
    /// Why it did not load.
    pub load_error: Option<String>,
}

/// Map a manifest runtime onto the catalog enum.
pub fn catalog_runtime(kind: RuntimeKind) -> PluginRuntime {
    match kind {
        RuntimeKind::Builtin => PluginRuntime::Builtin,
        RuntimeKind::Command => PluginRuntime::Command,
    }
}

/// Catalog record for a plugin directory.
pub fn record_from_manifest(slug: &str, manifest: &PluginManifest, dir: &Path) -> CreatePlugin {
    CreatePlugin {
        slug: slug.to_string(),
        name: manifest.name.clone(),
        description: manifest.description.clone(),
        version: manifest.version.clone(),
        author: manifest.author.clone(),
        category: manifest.category.clone(),
        tags: manifest.tags.clone(),
        file_path: Some(dir.display().to_string()),
        file_size: 0,
        file_hash: None,
        runtime: catalog_runtime(manifest.runtime),
        requirements: manifest.requirements.clone(),
        api_keys_required: manifest.api_keys_required.clone(),
        config_schema: manifest.config_schema.clone(),
        default_config: manifest.default_config.clone(),
        is_public: true,
        is_approved: true,
        uploaded_by: None,
    }
}

/// Admin-side catalog management.
#[derive(Debug, Clone)]
pub struct CatalogService {
    plugins: Arc<PluginRepository>,
    users: Arc<UserRepository>,
    loader: PluginLoader,
    analyzer: Arc<PluginAnalyzer>,
    mailer: Mailer,
    auto_approve: bool,
}

impl CatalogService {
    /// Creates a new catalog service.
    pub fn new(
        plugins: Arc<PluginRepository>,
        users: Arc<UserRepository>,
        loader: PluginLoader,
        analyzer: Arc<PluginAnalyzer>,
        mailer: Mailer,
        auto_approve: bool,
    ) -> Self {
        Self {
            plugins,
            users,
            loader,
            analyzer,
            mailer,
            auto_approve,
        }
    }

    /// Every non-archived plugin, or only those awaiting review.
    pub async fn list(&self, pending_only: bool) -> Result<Vec<Plugin>, AppError> {
        self.plugins.list_all(pending_only).await
    }

    /// Apply a moderation action.
    pub async fn moderate(
        &self,
        ctx: &RequestContext,
        id: PluginId,
        action: ModerationAction,
    ) -> Result<Plugin, AppError> {
        let updated = match action {
            ModerationAction::Approve => self.plugins.approve(id, ctx.user_id).await?,
            ModerationAction::Reject => self.plugins.reject(id).await?,
            ModerationAction::Toggle => self.plugins.toggle_active(id).await?,
            ModerationAction::Delete => self.plugins.archive(id).await?,
        };
        let plugin = updated.ok_or_else(|| AppError::not_found("Plugin not found"))?;

        if plugin.is_available() {
            if let Err(e) = self.loader.ensure_loaded(&plugin.slug).await {
                warn!(plugin = %plugin.slug, error = %e, "Plugin could not be loaded");
            }
        } else {
            self.loader.unload(&plugin.slug).await;
        }

        match action {
            ModerationAction::Approve => {
                self.notify_uploader(&plugin, EmailTemplate::PluginApproved {
                    plugin_name: plugin.name.clone(),
                })
                .await
            }
            ModerationAction::Reject => {
                self.notify_uploader(&plugin, EmailTemplate::PluginRejected {
                    plugin_name: plugin.name.clone(),
                })
                .await
            }
            ModerationAction::Toggle | ModerationAction::Delete => {}
        }

        info!(
            admin_id = %ctx.user_id,
            plugin = %plugin.slug,
            action = ?action,
            is_active = plugin.is_active,
            "Plugin moderated"
        );
        Ok(plugin)
    }

    async fn notify_uploader(&self, plugin: &Plugin, template: EmailTemplate) {
        let Some(uploader) = plugin.uploaded_by else {
            return;
        };
        match self.users.find_by_id(uploader).await {
            Ok(Some(user)) => self.mailer.send(&user.email, template),
            Ok(None) => {}
            Err(e) => warn!(user_id = %uploader, error = %e, "Failed to look up plugin uploader"),
        }
    }

    /// Analyse an uploaded package, install its files, register it, and
    /// load it.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<UploadResult, AppError> {
        let analyzer = Arc::clone(&self.analyzer);
        let report = tokio::task::spawn_blocking(move || analyzer.analyze(&filename, &bytes))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Package analysis failed", e))??;

        let slug = report.slug.clone();
        if self.plugins.find_by_slug(&slug).await?.is_some() {
            return Err(AppError::conflict(format!(
                "A plugin with identifier '{slug}' already exists"
            )));
        }
        let dir = self.loader.plugin_dir(&slug)?;
        if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(AppError::conflict(format!(
                "Plugin directory '{slug}' already exists"
            )));
        }

        report.write_to(&dir).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to write plugin files", e)
        })?;

        let mut record = record_from_manifest(&slug, &report.manifest, &dir);
        record.file_size = report.file_size as i64;
        record.file_hash = Some(report.file_hash.clone());
        record.is_approved = self.auto_approve;
        record.uploaded_by = Some(ctx.user_id);

        let plugin = match self.plugins.create(&record).await {
            Ok(plugin) => plugin,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
                    warn!(path = %dir.display(), error = %cleanup, "Failed to remove plugin files");
                }
                return Err(e);
            }
        };

        let missing_requirements = match report.manifest.runtime {
            RuntimeKind::Command => requirements::missing(&report.manifest.requirements),
            RuntimeKind::Builtin => Vec::new(),
        };
        let (loaded, load_error) = match self.loader.load(&slug).await {
            Ok(_) => (true, None),
            Err(e) => {
                warn!(plugin = %slug, error = %e, "Uploaded plugin did not load");
                (false, Some(e.to_string()))
            }
        };

        info!(
            admin_id = %ctx.user_id,
            plugin = %slug,
            approved = plugin.is_approved,
            warnings = report.warnings.len(),
            loaded,
            "Plugin uploaded"
        );

        Ok(UploadResult {
            files: report.file_paths(),
            plugin,
            analysis: report,
            missing_requirements,
            loaded,
            load_error,
        })
    }

    /// Register every loaded plugin that has no catalog record as an
    /// approved public plugin. Returns the slugs created.
    pub async fn sync(&self) -> Result<Vec<String>, AppError> {
        let known: HashSet<String> = self.plugins.slugs().await?.into_iter().collect();
        let mut created = Vec::new();

        for (slug, manifest, dir) in self.loader.registry().manifests().await {
            if known.contains(&slug) {
                continue;
            }
            match self
                .plugins
                .create(&record_from_manifest(&slug, &manifest, &dir))
                .await
            {
                Ok(plugin) => {
                    info!(plugin = %slug, id = %plugin.id, "Registered plugin from directory");
                    created.push(slug);
                }
                Err(e) if e.kind == ErrorKind::Conflict => {}
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }
}
