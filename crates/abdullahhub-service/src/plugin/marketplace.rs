//! Marketplace browsing, plugin details, and ratings.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use abdullahhub_core::error::AppError;
use abdullahhub_core::types::{PageRequest, PageResponse, PluginId};
use abdullahhub_database::repositories::{InstallationRepository, PluginRepository};
use abdullahhub_database::MarketplaceQuery;
use abdullahhub_entity::installation::PluginInstallation;
use abdullahhub_entity::plugin::{Plugin, PluginSummary};

use crate::context::RequestContext;

/// One marketplace page plus the filter vocabulary.
#[derive(Debug, Clone, Serialize)]
pub struct MarketplacePage {
    /// Matching plugins.
    #[serde(flatten)]
    pub page: PageResponse<Plugin>,
    /// Categories of every listed plugin.
    pub categories: Vec<String>,
    /// Active search term.
    pub search: Option<String>,
    /// Active category filter.
    pub category: Option<String>,
}

/// A plugin as seen by one user.
#[derive(Debug, Clone, Serialize)]
pub struct PluginDetails {
    /// Catalog record.
    pub plugin: Plugin,
    /// Whether the caller has it installed.
    pub is_installed: bool,
    /// The caller's installation.
    pub installation: Option<PluginInstallation>,
}

/// Read side of the catalog.
#[derive(Debug, Clone)]
pub struct MarketplaceService {
    plugins: Arc<PluginRepository>,
    installations: Arc<InstallationRepository>,
}

impl MarketplaceService {
    /// Creates a new marketplace service.
    pub fn new(plugins: Arc<PluginRepository>, installations: Arc<InstallationRepository>) -> Self {
        Self {
            plugins,
            installations,
        }
    }

    /// Search listed plugins.
    pub async fn browse(
        &self,
        query: MarketplaceQuery,
        page: PageRequest,
    ) -> Result<MarketplacePage, AppError> {
        let page = page.normalized();
        let results = self.plugins.marketplace(&query, &page).await?;
        let categories = self.plugins.categories().await?;
        Ok(MarketplacePage {
            page: results,
            categories,
            search: query.search,
            category: query.category,
        })
    }

    /// A plugin with the caller's installation state. Archived plugins and,
    /// for non-admins, unavailable ones are not found.
    pub async fn details(
        &self,
        ctx: &RequestContext,
        id: PluginId,
    ) -> Result<PluginDetails, AppError> {
        let plugin = super::find_plugin(&self.plugins, id).await?;
        if plugin.is_archived || (!plugin.is_available() && !ctx.is_admin) {
            return Err(AppError::not_found("Plugin not found"));
        }
        let installation = self.installations.find(ctx.user_id, id).await?;
        Ok(PluginDetails {
            plugin,
            is_installed: installation.is_some(),
            installation,
        })
    }

    /// Listed plugins for the unauthenticated API.
    pub async fn public_list(&self) -> Result<Vec<PluginSummary>, AppError> {
        let plugins = self.plugins.list_public().await?;
        Ok(plugins.iter().map(PluginSummary::from).collect())
    }

    /// Add a 1..=5 rating. Only users who installed the plugin may rate it.
    pub async fn rate(
        &self,
        ctx: &RequestContext,
        id: PluginId,
        score: u8,
    ) -> Result<Plugin, AppError> {
        super::find_plugin(&self.plugins, id).await?;
        if self.installations.find(ctx.user_id, id).await?.is_none() {
            return Err(AppError::authorization("Plugin not installed"));
        }

        let plugin = self
            .plugins
            .add_rating(id, score)
            .await?
            .ok_or_else(|| AppError::not_found("Plugin not found"))?;
        info!(plugin_id = %id, user_id = %ctx.user_id, score, rating = plugin.rating, "Plugin rated");
        Ok(plugin)
    }
}
