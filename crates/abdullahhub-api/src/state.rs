//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use sqlx::PgPool;

use abdullahhub_auth::JwtDecoder;
use abdullahhub_core::config::AppConfig;
use abdullahhub_database::repositories::UserRepository;
use abdullahhub_plugin::PluginLoader;
use abdullahhub_service::{
    AdminService, ApiKeyService, CatalogService, DashboardService, ExecutionService,
    InstallationService, MarketplaceService,
};

use crate::middleware::rate_limit::RateLimits;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped or cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// PostgreSQL connection pool
    pub db_pool: PgPool,
    /// Plugin loader and registry
    pub plugin_loader: PluginLoader,
    /// Per-IP rate limiters
    pub rate_limits: RateLimits,

    // ── Auth ─────────────────────────────────────────────────
    /// JWT token decoder and validator
    pub jwt_decoder: Arc<JwtDecoder>,
    /// User repository, consulted on every authenticated request
    pub user_repo: Arc<UserRepository>,

    // ── Services ─────────────────────────────────────────────
    /// Marketplace browsing and ratings
    pub marketplace_service: Arc<MarketplaceService>,
    /// Install, uninstall, configure
    pub installation_service: Arc<InstallationService>,
    /// Plugin execution
    pub execution_service: Arc<ExecutionService>,
    /// Admin catalog management
    pub catalog_service: Arc<CatalogService>,
    /// Stored credentials
    pub api_key_service: Arc<ApiKeyService>,
    /// User dashboard
    pub dashboard_service: Arc<DashboardService>,
    /// Admin dashboard
    pub admin_service: Arc<AdminService>,
}
