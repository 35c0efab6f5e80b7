//! Admin dashboard queries.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use abdullahhub_core::error::{AppError, ErrorKind};
use abdullahhub_core::types::{PageRequest, PageResponse};
use abdullahhub_database::repositories::{InstallationRepository, PluginRepository, UserRepository};
use abdullahhub_entity::user::User;
use abdullahhub_plugin::{LoadedPluginInfo, PluginLoader};

use super::logs;
use super::system::SystemInfo;

const RECENT_USERS: i64 = 10;

/// Catalog counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PluginTotals {
    /// Non-archived plugins.
    pub total: i64,
    /// Approved and active.
    pub active: i64,
    /// Awaiting review.
    pub pending: i64,
}

/// Body of `GET /admin`.
#[derive(Debug, Clone, Serialize)]
pub struct AdminOverview {
    /// Registered users.
    pub total_users: i64,
    /// Plugin counters.
    pub plugins: PluginTotals,
    /// Installations across all users.
    pub total_installations: i64,
    /// Executions across all plugins.
    pub total_executions: i64,
    /// Host metrics, when they could be sampled.
    pub system: Option<SystemInfo>,
    /// Newest accounts.
    pub recent_users: Vec<User>,
}

/// Body of `GET /admin/system`.
#[derive(Debug, Clone, Serialize)]
pub struct SystemView {
    /// Host metrics.
    pub system: Option<SystemInfo>,
    /// Last lines of the application log.
    pub logs: Vec<String>,
    /// Plugins currently in the registry.
    pub loaded_plugins: Vec<LoadedPluginInfo>,
}

/// Read-only admin queries.
#[derive(Debug, Clone)]
pub struct AdminService {
    users: Arc<UserRepository>,
    plugins: Arc<PluginRepository>,
    installations: Arc<InstallationRepository>,
    loader: PluginLoader,
    log_file: Option<PathBuf>,
    tail_lines: usize,
}

impl AdminService {
    /// Creates a new admin service. An empty `log_file` disables the log
    /// view.
    pub fn new(
        users: Arc<UserRepository>,
        plugins: Arc<PluginRepository>,
        installations: Arc<InstallationRepository>,
        loader: PluginLoader,
        log_file: &str,
        tail_lines: usize,
    ) -> Self {
        Self {
            users,
            plugins,
            installations,
            loader,
            log_file: (!log_file.is_empty()).then(|| PathBuf::from(log_file)),
            tail_lines,
        }
    }

    /// Counters, host metrics, and the newest users.
    pub async fn overview(&self) -> Result<AdminOverview, AppError> {
        let counts = self.plugins.counts().await?;
        Ok(AdminOverview {
            total_users: self.users.count().await?,
            plugins: PluginTotals {
                total: counts.total,
                active: counts.active,
                pending: counts.pending,
            },
            total_installations: self.installations.count_all().await?,
            total_executions: self.plugins.total_executions().await?,
            system: SystemInfo::sample().await,
            recent_users: self.users.recent(RECENT_USERS).await?,
        })
    }

    /// One page of users, newest first.
    pub async fn users(&self, page: &PageRequest) -> Result<PageResponse<User>, AppError> {
        self.users.list(&page.normalized()).await
    }

    /// Host metrics, recent log lines, and loaded plugins.
    pub async fn system(&self) -> Result<SystemView, AppError> {
        let logs = match &self.log_file {
            Some(path) => logs::tail(path, self.tail_lines).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to read application log", e)
            })?,
            None => {
                warn!("Log file is not configured; system view has no logs");
                Vec::new()
            }
        };
        Ok(SystemView {
            system: SystemInfo::sample().await,
            logs,
            loaded_plugins: self.loader.list().await,
        })
    }
}
