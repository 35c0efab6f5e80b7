//! Stored API key repository.

use sqlx::PgPool;

use abdullahhub_core::result::AppResult;
use abdullahhub_core::types::{ApiKeyId, PluginId, UserId};
use abdullahhub_entity::api_key::{ApiKey, UpsertApiKey};

use super::db_err;

/// Repository for encrypted third-party credentials.
#[derive(Debug, Clone)]
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    /// Create a new API key repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace the key a user holds for a plugin.
    ///
    /// Replacing resets the active flag but keeps the usage counters.
    pub async fn upsert(&self, data: &UpsertApiKey) -> AppResult<ApiKey> {
        sqlx::query_as::<_, ApiKey>(
            r#"INSERT INTO api_keys
                (user_id, plugin_id, name, api_key_encrypted, api_secret_encrypted,
                 key_hash, key_hint, api_url, environment, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               ON CONFLICT (user_id, plugin_id) DO UPDATE SET
                 name = EXCLUDED.name,
                 api_key_encrypted = EXCLUDED.api_key_encrypted,
                 api_secret_encrypted = EXCLUDED.api_secret_encrypted,
                 key_hash = EXCLUDED.key_hash,
                 key_hint = EXCLUDED.key_hint,
                 api_url = EXCLUDED.api_url,
                 environment = EXCLUDED.environment,
                 expires_at = EXCLUDED.expires_at,
                 is_active = TRUE,
                 updated_at = NOW()
               RETURNING *"#,
        )
        .bind(data.user_id)
        .bind(data.plugin_id)
        .bind(&data.name)
        .bind(&data.api_key_encrypted)
        .bind(&data.api_secret_encrypted)
        .bind(&data.key_hash)
        .bind(&data.key_hint)
        .bind(&data.api_url)
        .bind(data.environment)
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to store API key"))
    }

    /// The most recently updated key with the given hash.
    pub async fn find_by_hash(&self, key_hash: &str) -> AppResult<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE key_hash = $1 ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find API key by hash"))
    }

    /// The key a user stored for a plugin.
    pub async fn find_for_user_plugin(
        &self,
        user_id: UserId,
        plugin_id: PluginId,
    ) -> AppResult<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE user_id = $1 AND plugin_id = $2")
            .bind(user_id)
            .bind(plugin_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find API key"))
    }

    /// All keys of a user, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<ApiKey>> {
        sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list API keys"))
    }

    /// Delete a key owned by `user_id`. Returns whether a row was deleted.
    pub async fn delete(&self, id: ApiKeyId, user_id: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to delete API key"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Count one authenticated call.
    pub async fn record_usage(&self, id: ApiKeyId) -> AppResult<()> {
        sqlx::query(
            "UPDATE api_keys SET usage_count = usage_count + 1, last_used = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to record API key usage"))?;
        Ok(())
    }

    /// Number of keys a user has stored.
    pub async fn count_for_user(&self, user_id: UserId) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count API keys"))
    }
}
