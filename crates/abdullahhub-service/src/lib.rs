//! # abdullahhub-service
//!
//! Business logic for AbdullahHub. Each service orchestrates repositories,
//! the plugin runtime, credential encryption, and mail to implement one
//! group of use cases.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references or cheap clones.

pub mod admin;
pub mod api_key;
pub mod context;
pub mod dashboard;
pub mod plugin;
pub mod user;

pub use admin::{AdminOverview, AdminService, SystemInfo, SystemView};
pub use api_key::{ApiKeyService, ApiKeyView, StoreApiKeyRequest, StoredApiKey};
pub use context::RequestContext;
pub use dashboard::{Dashboard, DashboardService, InstalledPlugin};
pub use plugin::{
    CatalogService, ExecutionRequest, ExecutionService, InstallOutcome, InstallationService,
    MarketplacePage, MarketplaceService, ModerationAction, PluginConfigView, PluginDetails,
    UploadResult,
};
pub use user::{AdminUserService, CreateUserRequest, IssuedToken};
