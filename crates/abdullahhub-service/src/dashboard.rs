//! Per-user dashboard.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use abdullahhub_core::error::AppError;
use abdullahhub_core::types::PluginId;
use abdullahhub_database::repositories::{
    ApiKeyRepository, InstallationRepository, PluginRepository, UserRepository,
};
use abdullahhub_entity::installation::PluginInstallation;
use abdullahhub_entity::plugin::Plugin;
use abdullahhub_entity::user::UserStats;

use crate::context::RequestContext;

/// An installed plugin with the caller's installation record.
#[derive(Debug, Clone, Serialize)]
pub struct InstalledPlugin {
    /// The plugin.
    pub plugin: Plugin,
    /// The caller's installation.
    pub installation: PluginInstallation,
}

/// Body of `GET /dashboard`.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// Usage counters.
    pub stats: UserStats,
    /// Installed plugins, most recently installed first.
    pub installed_plugins: Vec<InstalledPlugin>,
}

/// Builds the dashboard view.
#[derive(Debug, Clone)]
pub struct DashboardService {
    users: Arc<UserRepository>,
    plugins: Arc<PluginRepository>,
    installations: Arc<InstallationRepository>,
    api_keys: Arc<ApiKeyRepository>,
}

impl DashboardService {
    /// Creates a new dashboard service.
    pub fn new(
        users: Arc<UserRepository>,
        plugins: Arc<PluginRepository>,
        installations: Arc<InstallationRepository>,
        api_keys: Arc<ApiKeyRepository>,
    ) -> Self {
        Self {
            users,
            plugins,
            installations,
            api_keys,
        }
    }

    /// Stats and installed plugins for the caller.
    pub async fn dashboard(&self, ctx: &RequestContext) -> Result<Dashboard, AppError> {
        let user = self
            .users
            .find_by_id(ctx.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let installations = self.installations.list_for_user(ctx.user_id).await?;
        let ids: Vec<PluginId> = installations.iter().map(|i| i.plugin_id).collect();
        let mut plugins: HashMap<PluginId, Plugin> = self
            .plugins
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let (installed, active, api_calls) = self.installations.counts_for_user(ctx.user_id).await?;
        let api_keys = self.api_keys.count_for_user(ctx.user_id).await?;

        let installed_plugins = installations
            .into_iter()
            .filter_map(|installation| {
                plugins
                    .remove(&installation.plugin_id)
                    .filter(|p| !p.is_archived)
                    .map(|plugin| InstalledPlugin {
                        plugin,
                        installation,
                    })
            })
            .collect();

        Ok(Dashboard {
            stats: UserStats {
                plugins_installed: installed,
                active_plugins: active,
                api_keys,
                api_calls,
                account_age_days: user.account_age_days(),
            },
            installed_plugins,
        })
    }
}
