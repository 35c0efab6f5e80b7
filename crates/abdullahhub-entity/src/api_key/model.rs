//! Stored API credential record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use abdullahhub_core::types::{ApiKeyId, PluginId, UserId};

use super::environment::KeyEnvironment;

/// A user's credential for one plugin.
///
/// The key and secret are stored encrypted; `key_hash` is a keyed hash of
/// the plain key used to authenticate `X-API-Key` requests, and `key_hint`
/// holds the last characters shown in masked views.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiKey {
    /// Record ID.
    pub id: ApiKeyId,
    /// Owner.
    pub user_id: UserId,
    /// Plugin the credential belongs to.
    pub plugin_id: PluginId,
    /// Label.
    pub name: Option<String>,
    /// Encrypted key.
    #[serde(skip_serializing)]
    pub api_key_encrypted: String,
    /// Encrypted secret.
    #[serde(skip_serializing)]
    pub api_secret_encrypted: Option<String>,
    /// Keyed hash of the plain key.
    #[serde(skip_serializing)]
    pub key_hash: String,
    /// Trailing characters of the plain key.
    pub key_hint: String,
    /// Endpoint override.
    pub api_url: Option<String>,
    /// Target environment.
    pub environment: KeyEnvironment,
    /// Disabled keys are rejected.
    pub is_active: bool,
    /// Number of authenticated calls.
    pub usage_count: i64,
    /// Last authenticated call.
    pub last_used: Option<DateTime<Utc>>,
    /// Requests per hour the owner asked for.
    pub rate_limit: i32,
    /// Expiry time.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl ApiKey {
    /// Whether `expires_at` lies in the past.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// Whether the key may authenticate a request.
    pub fn is_usable(&self) -> bool {
        self.is_active && !self.is_expired()
    }
}

/// Values written by an upsert on (user, plugin).
#[derive(Debug, Clone)]
pub struct UpsertApiKey {
    /// Owner.
    pub user_id: UserId,
    /// Plugin.
    pub plugin_id: PluginId,
    /// Label.
    pub name: Option<String>,
    /// Encrypted key.
    pub api_key_encrypted: String,
    /// Encrypted secret.
    pub api_secret_encrypted: Option<String>,
    /// Keyed hash of the plain key.
    pub key_hash: String,
    /// Trailing characters of the plain key.
    pub key_hint: String,
    /// Endpoint override.
    pub api_url: Option<String>,
    /// Target environment.
    pub environment: KeyEnvironment,
    /// Expiry time.
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(expires_at: Option<DateTime<Utc>>) -> ApiKey {
        let now = Utc::now();
        ApiKey {
            id: ApiKeyId::new(),
            user_id: UserId::new(),
            plugin_id: PluginId::new(),
            name: None,
            api_key_encrypted: "enc".into(),
            api_secret_encrypted: None,
            key_hash: "hash".into(),
            key_hint: "abcd".into(),
            api_url: None,
            environment: KeyEnvironment::Production,
            is_active: true,
            usage_count: 0,
            last_used: None,
            rate_limit: 100,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_expiry() {
        assert!(!key(None).is_expired());
        assert!(key(Some(Utc::now() - chrono::Duration::minutes(1))).is_expired());
        assert!(key(Some(Utc::now() + chrono::Duration::days(1))).is_usable());
    }

    #[test]
    fn test_inactive_key_unusable() {
        let mut k = key(None);
        k.is_active = false;
        assert!(!k.is_usable());
    }

    #[test]
    fn test_secrets_not_serialized() {
        let json = serde_json::to_value(key(None)).expect("serialize");
        assert!(json.get("api_key_encrypted").is_none());
        assert!(json.get("key_hash").is_none());
        assert_eq!(json["environment"], "production");
    }
}
