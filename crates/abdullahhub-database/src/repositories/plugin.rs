//! Plugin catalog repository.

use sqlx::PgPool;

use abdullahhub_core::result::AppResult;
use abdullahhub_core::types::{PageRequest, PageResponse, PluginId, UserId};
use abdullahhub_entity::plugin::{CreatePlugin, Plugin};

use super::{db_err, map_unique};

const LISTED: &str = "is_public AND is_approved AND is_active AND NOT is_archived";

/// Marketplace search filters.
#[derive(Debug, Clone, Default)]
pub struct MarketplaceQuery {
    /// Substring matched against name and description.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
}

/// Catalog-wide counters for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct PluginCounts {
    /// All non-archived plugins.
    pub total: i64,
    /// Approved and active.
    pub active: i64,
    /// Awaiting review.
    pub pending: i64,
}

/// Repository for the plugin catalog.
#[derive(Debug, Clone)]
pub struct PluginRepository {
    pool: PgPool,
}

impl PluginRepository {
    /// Create a new plugin repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a plugin. A duplicate slug yields a conflict.
    pub async fn create(&self, data: &CreatePlugin) -> AppResult<Plugin> {
        sqlx::query_as::<_, Plugin>(
            r#"INSERT INTO plugins
                (slug, name, description, version, author, category, tags,
                 file_path, file_size, file_hash, runtime, requirements,
                 api_keys_required, config_schema, default_config,
                 is_public, is_approved, uploaded_by,
                 approved_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                       $16, $17, $18,
                       CASE WHEN $17 THEN NOW() ELSE NULL END)
               RETURNING *"#,
        )
        .bind(&data.slug)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.version)
        .bind(&data.author)
        .bind(&data.category)
        .bind(&data.tags)
        .bind(&data.file_path)
        .bind(data.file_size)
        .bind(&data.file_hash)
        .bind(data.runtime)
        .bind(&data.requirements)
        .bind(&data.api_keys_required)
        .bind(&data.config_schema)
        .bind(&data.default_config)
        .bind(data.is_public)
        .bind(data.is_approved)
        .bind(data.uploaded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique(
                e,
                "plugins_slug_key",
                format!("Plugin '{}' already exists", data.slug),
                "Failed to create plugin",
            )
        })
    }

    /// Find a plugin by primary key.
    pub async fn find_by_id(&self, id: PluginId) -> AppResult<Option<Plugin>> {
        sqlx::query_as::<_, Plugin>("SELECT * FROM plugins WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find plugin by id"))
    }

    /// Find a plugin by slug.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Plugin>> {
        sqlx::query_as::<_, Plugin>("SELECT * FROM plugins WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find plugin by slug"))
    }

    /// Fetch several plugins at once.
    pub async fn find_by_ids(&self, ids: &[PluginId]) -> AppResult<Vec<Plugin>> {
        let ids: Vec<uuid::Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        sqlx::query_as::<_, Plugin>("SELECT * FROM plugins WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to find plugins by id"))
    }

    /// Public, approved, active, non-archived plugins, most downloaded first.
    pub async fn marketplace(
        &self,
        query: &MarketplaceQuery,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Plugin>> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let filter = format!(
            "{LISTED}
             AND ($1::TEXT IS NULL OR name ILIKE $1 OR description ILIKE $1)
             AND ($2::TEXT IS NULL OR category = $2)"
        );

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM plugins WHERE {filter}"))
            .bind(&pattern)
            .bind(category)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count marketplace plugins"))?;

        let plugins = sqlx::query_as::<_, Plugin>(&format!(
            "SELECT * FROM plugins WHERE {filter}
             ORDER BY download_count DESC, name ASC
             LIMIT $3 OFFSET $4"
        ))
        .bind(&pattern)
        .bind(category)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to search marketplace"))?;

        Ok(PageResponse::new(plugins, page, total.max(0) as u64))
    }

    /// All listed plugins, for the public API.
    pub async fn list_public(&self) -> AppResult<Vec<Plugin>> {
        sqlx::query_as::<_, Plugin>(&format!(
            "SELECT * FROM plugins WHERE {LISTED} ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list public plugins"))
    }

    /// Distinct categories of listed plugins.
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(&format!(
            "SELECT DISTINCT category FROM plugins WHERE {LISTED} ORDER BY category"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list categories"))
    }

    /// Every non-archived plugin, newest first. `pending_only` restricts
    /// to unapproved ones.
    pub async fn list_all(&self, pending_only: bool) -> AppResult<Vec<Plugin>> {
        sqlx::query_as::<_, Plugin>(
            r#"SELECT * FROM plugins
               WHERE NOT is_archived AND ($1 = FALSE OR is_approved = FALSE)
               ORDER BY created_at DESC"#,
        )
        .bind(pending_only)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list plugins"))
    }

    /// Slugs of every registered plugin, archived included.
    pub async fn slugs(&self) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT slug FROM plugins")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list plugin slugs"))
    }

    /// Approve and activate a plugin.
    pub async fn approve(&self, id: PluginId, admin: UserId) -> AppResult<Option<Plugin>> {
        sqlx::query_as::<_, Plugin>(
            r#"UPDATE plugins
               SET is_approved = TRUE, is_active = TRUE, approved_by = $2,
                   approved_at = NOW(), updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(admin)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to approve plugin"))
    }

    /// Withdraw approval and deactivate.
    pub async fn reject(&self, id: PluginId) -> AppResult<Option<Plugin>> {
        sqlx::query_as::<_, Plugin>(
            r#"UPDATE plugins
               SET is_approved = FALSE, is_active = FALSE, approved_by = NULL,
                   approved_at = NULL, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to reject plugin"))
    }

    /// Flip `is_active`.
    pub async fn toggle_active(&self, id: PluginId) -> AppResult<Option<Plugin>> {
        sqlx::query_as::<_, Plugin>(
            r#"UPDATE plugins
               SET is_active = NOT is_active, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to toggle plugin"))
    }

    /// Soft-delete: archive and deactivate.
    pub async fn archive(&self, id: PluginId) -> AppResult<Option<Plugin>> {
        sqlx::query_as::<_, Plugin>(
            r#"UPDATE plugins
               SET is_archived = TRUE, is_active = FALSE, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to archive plugin"))
    }

    /// Bump the install counter.
    /// Bump the execution counter.
    pub async fn increment_executions(&self, id: PluginId) -> AppResult<()> {
        sqlx::query("UPDATE plugins SET execution_count = execution_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to increment execution count"))?;
        Ok(())
    }

    /// Fold one score into the running average atomically.
    pub async fn add_rating(&self, id: PluginId, score: u8) -> AppResult<Option<Plugin>> {
        sqlx::query_as::<_, Plugin>(
            r#"UPDATE plugins
               SET rating = (rating * review_count + $2) / (review_count + 1),
                   review_count = review_count + 1,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(f64::from(score))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to update rating"))
    }

    /// Total, active and pending plugin counts.
    pub async fn counts(&self) -> AppResult<PluginCounts> {
        sqlx::query_as::<_, PluginCounts>(
            r#"SELECT
                 COUNT(*) AS total,
                 COUNT(*) FILTER (WHERE is_active AND is_approved) AS active,
                 COUNT(*) FILTER (WHERE NOT is_approved) AS pending
               FROM plugins
               WHERE NOT is_archived"#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to count plugins"))
    }

    /// Sum of execution counters across the catalog.
    pub async fn total_executions(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COALESCE(SUM(execution_count), 0)::BIGINT FROM plugins")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to sum executions"))
    }
}

/// Escape `%`, `_` and `\` so user input matches literally under `ILIKE`.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
