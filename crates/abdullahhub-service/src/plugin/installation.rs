//! Installing, uninstalling, and configuring plugins.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use abdullahhub_core::error::{AppError, ErrorKind};
use abdullahhub_core::types::PluginId;
use abdullahhub_database::repositories::{InstallationRepository, PluginRepository, UserRepository};
use abdullahhub_entity::installation::PluginInstallation;
use abdullahhub_entity::plugin::{Plugin, PluginRuntime};
use abdullahhub_mail::{EmailTemplate, Mailer};
use abdullahhub_plugin::{PluginLoader, requirements};

use crate::context::RequestContext;

/// Result of an install request.
#[derive(Debug, Clone)]
pub enum InstallOutcome {
    /// A new installation was created.
    Installed {
        /// The plugin.
        plugin: Plugin,
        /// The installation.
        installation: PluginInstallation,
    },
    /// The caller already had it installed.
    AlreadyInstalled,
}

/// A plugin's configuration as seen by one user.
#[derive(Debug, Clone, Serialize)]
pub struct PluginConfigView {
    /// The caller's configuration merged over the defaults.
    pub config: Value,
    /// JSON schema of the configuration.
    pub schema: Value,
    /// Plugin defaults.
    pub default_config: Value,
}

/// Manages per-user installations.
#[derive(Debug, Clone)]
pub struct InstallationService {
    plugins: Arc<PluginRepository>,
    installations: Arc<InstallationRepository>,
    users: Arc<UserRepository>,
    loader: PluginLoader,
    mailer: Mailer,
}

impl InstallationService {
    /// Creates a new installation service.
    pub fn new(
        plugins: Arc<PluginRepository>,
        installations: Arc<InstallationRepository>,
        users: Arc<UserRepository>,
        loader: PluginLoader,
        mailer: Mailer,
    ) -> Self {
        Self {
            plugins,
            installations,
            users,
            loader,
            mailer,
        }
    }

    /// Install a plugin for the caller.
    ///
    /// The plugin must be active and approved, its required executables
    /// must resolve, and it must load. Downloads are counted and the user
    /// is notified by email.
    pub async fn install(
        &self,
        ctx: &RequestContext,
        id: PluginId,
    ) -> Result<InstallOutcome, AppError> {
        let plugin = super::find_plugin(&self.plugins, id).await?;

        if self.installations.find(ctx.user_id, id).await?.is_some() {
            return Ok(InstallOutcome::AlreadyInstalled);
        }
        if !plugin.is_available() {
            return Err(AppError::validation("Plugin is not available for installation"));
        }

        if plugin.runtime == PluginRuntime::Command {
            let missing = requirements::missing(&plugin.requirements);
            if !missing.is_empty() {
                return Err(AppError::validation(format!(
                    "Missing plugin requirements: {}",
                    missing.join(", ")
                )));
            }
        }

        self.loader.ensure_loaded(&plugin.slug).await?;

        let installation = match self
            .installations
            .create(ctx.user_id, id, &plugin.default_config)
            .await
        {
            Ok(installation) => installation,
            Err(e) if e.kind == ErrorKind::Conflict => {
                return Ok(InstallOutcome::AlreadyInstalled);
            }
            Err(e) => return Err(e),
        };

        info!(user_id = %ctx.user_id, plugin = %plugin.slug, "Plugin installed");

        // The installation is committed; notification failures stay in the log.
        match self.users.find_by_id(ctx.user_id).await {
            Ok(Some(user)) => self.mailer.send(
                &user.email,
                EmailTemplate::PluginInstalled {
                    username: user.username.clone(),
                    plugin_name: plugin.name.clone(),
                },
            ),
            Ok(None) => {}
            Err(e) => warn!(user_id = %ctx.user_id, error = %e, "Install notification skipped"),
        }

        Ok(InstallOutcome::Installed {
            plugin,
            installation,
        })
    }

    /// Remove the caller's installation.
    pub async fn uninstall(&self, ctx: &RequestContext, id: PluginId) -> Result<(), AppError> {
        if !self.installations.delete(ctx.user_id, id).await? {
            return Err(AppError::not_found("Plugin not installed"));
        }
        info!(user_id = %ctx.user_id, plugin_id = %id, "Plugin uninstalled");
        Ok(())
    }

    /// The caller's effective configuration, schema, and defaults.
    pub async fn config(
        &self,
        ctx: &RequestContext,
        id: PluginId,
    ) -> Result<PluginConfigView, AppError> {
        let plugin = super::find_plugin(&self.plugins, id).await?;
        let installation = self.require_installation(ctx, id).await?;
        Ok(PluginConfigView {
            config: installation.effective_config(&plugin.default_config),
            schema: plugin.config_schema,
            default_config: plugin.default_config,
        })
    }

    /// Merge `changes` into the caller's configuration.
    pub async fn update_config(
        &self,
        ctx: &RequestContext,
        id: PluginId,
        changes: &Value,
    ) -> Result<PluginConfigView, AppError> {
        if !changes.is_object() {
            return Err(AppError::validation("Configuration must be a JSON object"));
        }
        let plugin = super::find_plugin(&self.plugins, id).await?;
        let installation = self
            .installations
            .merge_config(ctx.user_id, id, changes)
            .await?
            .ok_or_else(|| AppError::authorization("Plugin not installed"))?;

        info!(user_id = %ctx.user_id, plugin = %plugin.slug, "Plugin configuration updated");
        Ok(PluginConfigView {
            config: installation.effective_config(&plugin.default_config),
            schema: plugin.config_schema,
            default_config: plugin.default_config,
        })
    }

    async fn require_installation(
        &self,
        ctx: &RequestContext,
        id: PluginId,
    ) -> Result<PluginInstallation, AppError> {
        self.installations
            .find(ctx.user_id, id)
            .await?
            .ok_or_else(|| AppError::authorization("Plugin not installed"))
    }
}
