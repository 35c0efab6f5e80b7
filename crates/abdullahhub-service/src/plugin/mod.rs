//! Plugin use cases: marketplace, installations, execution, and catalog
//! administration.

pub mod catalog;
pub mod execution;
pub mod installation;
pub mod marketplace;

pub use catalog::{CatalogService, ModerationAction, UploadResult};
pub use execution::{ExecutionRequest, ExecutionService};
pub use installation::{InstallOutcome, InstallationService, PluginConfigView};
pub use marketplace::{MarketplacePage, MarketplaceService, PluginDetails};

use abdullahhub_core::error::AppError;
use abdullahhub_core::types::PluginId;
use abdullahhub_database::repositories::PluginRepository;
use abdullahhub_entity::plugin::Plugin;

/// Fetch a plugin or fail with not found.
pub(crate) async fn find_plugin(repo: &PluginRepository, id: PluginId) -> Result<Plugin, AppError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Plugin not found"))
}
