//! Plugin installation repository.

use serde_json::Value;
use sqlx::PgPool;

use abdullahhub_core::result::AppResult;
use abdullahhub_core::types::{PluginId, UserId};
use abdullahhub_entity::installation::PluginInstallation;

use super::{db_err, map_unique};

/// Repository for per-user plugin installations.
#[derive(Debug, Clone)]
pub struct InstallationRepository {
    pool: PgPool,
}

impl InstallationRepository {
    /// Create a new installation repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Install `plugin_id` for `user_id` with an initial configuration and
    /// count the download in the same statement.
    pub async fn create(
        &self,
        user_id: UserId,
        plugin_id: PluginId,
        config: &Value,
    ) -> AppResult<PluginInstallation> {
        sqlx::query_as::<_, PluginInstallation>(
            r#"WITH installed AS (
                   INSERT INTO plugin_installations (user_id, plugin_id, config)
                   VALUES ($1, $2, $3)
                   RETURNING *
               ), counted AS (
                   UPDATE plugins SET download_count = download_count + 1
                   WHERE id = $2 AND EXISTS (SELECT 1 FROM installed)
               )
               SELECT * FROM installed"#,
        )
        .bind(user_id)
        .bind(plugin_id)
        .bind(config)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique(
                e,
                "unique_user_plugin",
                "Plugin already installed",
                "Failed to create installation",
            )
        })
    }

    /// The installation of a plugin by a user, if any.
    pub async fn find(
        &self,
        user_id: UserId,
        plugin_id: PluginId,
    ) -> AppResult<Option<PluginInstallation>> {
        sqlx::query_as::<_, PluginInstallation>(
            "SELECT * FROM plugin_installations WHERE user_id = $1 AND plugin_id = $2",
        )
        .bind(user_id)
        .bind(plugin_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find installation"))
    }

    /// All installations of a user, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<PluginInstallation>> {
        sqlx::query_as::<_, PluginInstallation>(
            "SELECT * FROM plugin_installations WHERE user_id = $1 ORDER BY installed_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list installations"))
    }

    /// Remove an installation. Returns whether a row was deleted.
    pub async fn delete(&self, user_id: UserId, plugin_id: PluginId) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM plugin_installations WHERE user_id = $1 AND plugin_id = $2")
                .bind(user_id)
                .bind(plugin_id)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to delete installation"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Shallow-merge `changes` into the stored configuration.
    pub async fn merge_config(
        &self,
        user_id: UserId,
        plugin_id: PluginId,
        changes: &Value,
    ) -> AppResult<Option<PluginInstallation>> {
        sqlx::query_as::<_, PluginInstallation>(
            r#"UPDATE plugin_installations
               SET config = config || $3::jsonb, updated_at = NOW()
               WHERE user_id = $1 AND plugin_id = $2
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(plugin_id)
        .bind(changes)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to update installation config"))
    }

    /// Count one execution through the installation.
    pub async fn record_usage(&self, user_id: UserId, plugin_id: PluginId) -> AppResult<()> {
        sqlx::query(
            r#"UPDATE plugin_installations
               SET usage_count = usage_count + 1, last_used = NOW()
               WHERE user_id = $1 AND plugin_id = $2"#,
        )
        .bind(user_id)
        .bind(plugin_id)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to record installation usage"))?;
        Ok(())
    }

    /// Number of installations a user has, and how many are active.
    pub async fn counts_for_user(&self, user_id: UserId) -> AppResult<(i64, i64, i64)> {
        sqlx::query_as::<_, (i64, i64, i64)>(
            r#"SELECT
                 COUNT(*),
                 COUNT(*) FILTER (WHERE is_active AND is_enabled),
                 COALESCE(SUM(usage_count), 0)::BIGINT
               FROM plugin_installations
               WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count installations"))
    }

    /// Installations across all users.
    pub async fn count_all(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM plugin_installations")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count installations"))
    }
}
