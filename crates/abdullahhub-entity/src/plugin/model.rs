//! Plugin catalog record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use abdullahhub_core::types::{PluginId, UserId};

use super::runtime::PluginRuntime;

/// A plugin known to the marketplace.
///
/// `slug` is the directory name under the plugin directory and the key the
/// runtime registry uses; `id` is the database identity exposed over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plugin {
    /// Unique plugin identifier.
    pub id: PluginId,
    /// Runtime identifier (directory name).
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Version string.
    pub version: String,
    /// Author or maintainer.
    pub author: String,
    /// Marketplace category.
    pub category: String,
    /// Search tags.
    pub tags: Vec<String>,
    /// Location of the uploaded package, if any.
    pub file_path: Option<String>,
    /// Size of the uploaded package in bytes.
    pub file_size: i64,
    /// SHA-256 of the uploaded package.
    pub file_hash: Option<String>,
    /// How the entry point is invoked.
    pub runtime: PluginRuntime,
    /// Executables a command plugin needs on `PATH`.
    pub requirements: Vec<String>,
    /// Names of credentials the plugin expects.
    pub api_keys_required: Vec<String>,
    /// JSON schema describing the configuration.
    pub config_schema: serde_json::Value,
    /// Configuration applied before the user's own.
    pub default_config: serde_json::Value,
    /// Listed in the marketplace.
    pub is_public: bool,
    /// Can be installed and executed.
    pub is_active: bool,
    /// Reviewed by an administrator.
    pub is_approved: bool,
    /// Soft-deleted.
    pub is_archived: bool,
    /// Paid plugin.
    pub is_premium: bool,
    /// Number of installs.
    pub download_count: i64,
    /// Number of executions.
    pub execution_count: i64,
    /// Average rating (0 to 5).
    pub rating: f64,
    /// Number of ratings.
    pub review_count: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Uploading user.
    pub uploaded_by: Option<UserId>,
    /// Approving administrator.
    pub approved_by: Option<UserId>,
    /// Approval time.
    pub approved_at: Option<DateTime<Utc>>,
}

impl Plugin {
    /// Whether the plugin may be installed and executed.
    pub fn is_available(&self) -> bool {
        self.is_active && self.is_approved && !self.is_archived
    }

    /// Whether the plugin appears in the marketplace.
    pub fn is_listed(&self) -> bool {
        self.is_public && self.is_available()
    }
}

/// Fields needed to register a new plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlugin {
    /// Runtime identifier (directory name).
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Version string.
    pub version: String,
    /// Author.
    pub author: String,
    /// Category.
    pub category: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Package location.
    pub file_path: Option<String>,
    /// Package size.
    pub file_size: i64,
    /// Package hash.
    pub file_hash: Option<String>,
    /// Runtime kind.
    pub runtime: PluginRuntime,
    /// Required executables.
    pub requirements: Vec<String>,
    /// Required credential names.
    pub api_keys_required: Vec<String>,
    /// Configuration schema.
    pub config_schema: serde_json::Value,
    /// Default configuration.
    pub default_config: serde_json::Value,
    /// Listed in the marketplace.
    pub is_public: bool,
    /// Approved on creation.
    pub is_approved: bool,
    /// Uploading user.
    pub uploaded_by: Option<UserId>,
}

/// Public listing view used by the unauthenticated API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSummary {
    /// Plugin ID.
    pub id: PluginId,
    /// Name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Version.
    pub version: String,
    /// Author.
    pub author: String,
    /// Category.
    pub category: String,
    /// Install count.
    pub downloads: i64,
    /// Average rating.
    pub rating: f64,
}

impl From<&Plugin> for PluginSummary {
    fn from(plugin: &Plugin) -> Self {
        Self {
            id: plugin.id,
            name: plugin.name.clone(),
            description: plugin.description.clone(),
            version: plugin.version.clone(),
            author: plugin.author.clone(),
            category: plugin.category.clone(),
            downloads: plugin.download_count,
            rating: plugin.rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plugin() -> Plugin {
        let now = Utc::now();
        Plugin {
            id: PluginId::new(),
            slug: "removebg".into(),
            name: "Remove Background".into(),
            description: "Strip image backgrounds".into(),
            version: "1.0.0".into(),
            author: "AbdullahHub".into(),
            category: "Image".into(),
            tags: vec!["image".into()],
            file_path: None,
            file_size: 0,
            file_hash: None,
            runtime: PluginRuntime::Builtin,
            requirements: Vec::new(),
            api_keys_required: vec!["api_key".into()],
            config_schema: serde_json::json!({}),
            default_config: serde_json::json!({}),
            is_public: true,
            is_active: true,
            is_approved: true,
            is_archived: false,
            is_premium: false,
            download_count: 12,
            execution_count: 40,
            rating: 4.0,
            review_count: 3,
            created_at: now,
            updated_at: now,
            uploaded_by: None,
            approved_by: None,
            approved_at: None,
        }
    }

    #[test]
    fn test_availability_flags() {
        let mut plugin = sample_plugin();
        assert!(plugin.is_listed());

        plugin.is_approved = false;
        assert!(!plugin.is_available());

        plugin.is_approved = true;
        plugin.is_archived = true;
        assert!(!plugin.is_available());

        plugin.is_archived = false;
        plugin.is_public = false;
        assert!(plugin.is_available());
        assert!(!plugin.is_listed());
    }

    #[test]
    fn test_summary_view() {
        let plugin = sample_plugin();
        let summary = PluginSummary::from(&plugin);
        assert_eq!(summary.downloads, 12);
        assert_eq!(summary.name, "Remove Background");
    }
}
