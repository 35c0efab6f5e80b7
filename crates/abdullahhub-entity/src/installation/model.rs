//! Installation record linking a user to a plugin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use abdullahhub_core::types::{InstallationId, PluginId, UserId};

/// A plugin installed by a user. At most one per (user, plugin).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PluginInstallation {
    /// Installation ID.
    pub id: InstallationId,
    /// Owner.
    pub user_id: UserId,
    /// Installed plugin.
    pub plugin_id: PluginId,
    /// User configuration (JSON object).
    pub config: Value,
    /// Administrative switch.
    pub is_active: bool,
    /// User-controlled switch.
    pub is_enabled: bool,
    /// Number of executions through this installation.
    pub usage_count: i64,
    /// Last execution time.
    pub last_used: Option<DateTime<Utc>>,
    /// Installation time.
    pub installed_at: DateTime<Utc>,
    /// Last configuration change.
    pub updated_at: DateTime<Utc>,
}

impl PluginInstallation {
    /// Whether the installation may be executed.
    pub fn is_usable(&self) -> bool {
        self.is_active && self.is_enabled
    }

    /// The configuration a plugin sees: user values over the plugin defaults.
    pub fn effective_config(&self, defaults: &Value) -> Value {
        merge_config(defaults, &self.config)
    }
}

/// Shallow merge: top-level keys of `update` overwrite those of `base`.
///
/// Non-object inputs are treated as empty objects.
pub fn merge_config(base: &Value, update: &Value) -> Value {
    let mut merged = match base {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    if let Value::Object(changes) = update {
        for (key, value) in changes {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}
