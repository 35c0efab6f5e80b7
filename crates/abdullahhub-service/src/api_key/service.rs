//! Stored credentials: listing, upsert, and deletion.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use abdullahhub_auth::CredentialCipher;
use abdullahhub_auth::crypto::{ApiKeyHasher, generate_api_key, generate_api_secret, key_hint};
use abdullahhub_core::error::AppError;
use abdullahhub_core::types::{ApiKeyId, PluginId};
use abdullahhub_database::repositories::{ApiKeyRepository, PluginRepository};
use abdullahhub_entity::api_key::{ApiKey, KeyEnvironment, UpsertApiKey};

use crate::context::RequestContext;

const MASK: &str = "********";
const MIN_VISIBLE_KEY_LEN: usize = 8;

/// Body of `POST /api/keys`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct StoreApiKeyRequest {
    /// Plugin the key is for.
    pub plugin_id: PluginId,
    /// Plain key; generated when omitted.
    #[serde(default)]
    #[validate(length(max = 512, message = "API key must be at most 512 characters"))]
    pub api_key: Option<String>,
    /// Plain secret.
    #[serde(default)]
    #[validate(length(max = 512, message = "API secret must be at most 512 characters"))]
    pub api_secret: Option<String>,
    /// Label.
    #[serde(default)]
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
    /// Endpoint override.
    #[serde(default)]
    #[validate(length(max = 256, message = "API URL must be at most 256 characters"))]
    pub api_url: Option<String>,
    /// `sandbox` or `production`.
    #[serde(default)]
    #[validate(length(max = 20))]
    pub environment: Option<String>,
    /// Expiry time.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A stored key as shown to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyView {
    /// Record ID.
    pub id: ApiKeyId,
    /// Plugin ID.
    pub plugin_id: PluginId,
    /// Plugin display name.
    pub plugin_name: Option<String>,
    /// Label.
    pub name: Option<String>,
    /// Masked key.
    pub api_key: String,
    /// Whether a secret is stored.
    pub has_secret: bool,
    /// Endpoint override.
    pub api_url: Option<String>,
    /// Environment.
    pub environment: KeyEnvironment,
    /// Active and not expired.
    pub is_active: bool,
    /// Authenticated calls.
    pub usage_count: i64,
    /// Last call.
    pub last_used: Option<DateTime<Utc>>,
    /// Expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ApiKeyView {
    /// Masked view of a stored key.
    pub fn from_key(key: &ApiKey, plugin_name: Option<String>) -> Self {
        Self {
            id: key.id,
            plugin_id: key.plugin_id,
            plugin_name,
            name: key.name.clone(),
            api_key: format!("{MASK}{}", key.key_hint),
            has_secret: key.api_secret_encrypted.is_some(),
            api_url: key.api_url.clone(),
            environment: key.environment,
            is_active: key.is_usable(),
            usage_count: key.usage_count,
            last_used: key.last_used,
            expires_at: key.expires_at,
            created_at: key.created_at,
        }
    }
}

/// Result of storing a key. Generated credentials are returned once.
#[derive(Debug, Clone, Serialize)]
pub struct StoredApiKey {
    /// Masked view.
    pub key: ApiKeyView,
    /// Plain key, only when it was generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_key: Option<String>,
    /// Plain secret, only when it was generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_secret: Option<String>,
}

/// Trailing characters kept for display; none for short keys.
fn display_hint(api_key: &str) -> String {
    if api_key.chars().count() < MIN_VISIBLE_KEY_LEN {
        String::new()
    } else {
        key_hint(api_key)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Manages a user's stored credentials.
#[derive(Debug, Clone)]
pub struct ApiKeyService {
    api_keys: Arc<ApiKeyRepository>,
    plugins: Arc<PluginRepository>,
    cipher: Arc<CredentialCipher>,
    hasher: Arc<ApiKeyHasher>,
}

impl ApiKeyService {
    /// Creates a new API key service.
    pub fn new(
        api_keys: Arc<ApiKeyRepository>,
        plugins: Arc<PluginRepository>,
        cipher: Arc<CredentialCipher>,
        hasher: Arc<ApiKeyHasher>,
    ) -> Self {
        Self {
            api_keys,
            plugins,
            cipher,
            hasher,
        }
    }

    /// The caller's keys, masked, newest first.
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<ApiKeyView>, AppError> {
        let keys = self.api_keys.list_for_user(ctx.user_id).await?;
        let mut ids: Vec<PluginId> = keys.iter().map(|k| k.plugin_id).collect();
        ids.sort_by_key(|id| id.0);
        ids.dedup();

        let names: HashMap<PluginId, String> = self
            .plugins
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        Ok(keys
            .iter()
            .map(|k| ApiKeyView::from_key(k, names.get(&k.plugin_id).cloned()))
            .collect())
    }

    /// Store (or replace) the caller's key for a plugin.
    pub async fn store(
        &self,
        ctx: &RequestContext,
        request: StoreApiKeyRequest,
    ) -> Result<StoredApiKey, AppError> {
        let plugin = crate::plugin::find_plugin(&self.plugins, request.plugin_id).await?;

        let environment = match non_empty(request.environment) {
            Some(env) => env.parse::<KeyEnvironment>()?,
            None => KeyEnvironment::default(),
        };
        if request.expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(AppError::validation("Expiry must be in the future"));
        }

        let (api_key, generated_key) = match non_empty(request.api_key) {
            Some(key) => (key, None),
            None => {
                let key = generate_api_key();
                (key.clone(), Some(key))
            }
        };
        let (api_secret, generated_secret) = match (non_empty(request.api_secret), &generated_key) {
            (Some(secret), _) => (Some(secret), None),
            (None, Some(_)) => {
                let secret = generate_api_secret();
                (Some(secret.clone()), Some(secret))
            }
            (None, None) => (None, None),
        };

        let api_secret_encrypted = match &api_secret {
            Some(secret) => Some(self.cipher.encrypt(secret)?),
            None => None,
        };
        let data = UpsertApiKey {
            user_id: ctx.user_id,
            plugin_id: plugin.id,
            name: non_empty(request.name),
            api_key_encrypted: self.cipher.encrypt(&api_key)?,
            api_secret_encrypted,
            key_hash: self.hasher.hash(&api_key),
            key_hint: display_hint(&api_key),
            api_url: non_empty(request.api_url),
            environment,
            expires_at: request.expires_at,
        };

        let stored = self.api_keys.upsert(&data).await?;
        info!(user_id = %ctx.user_id, plugin = %plugin.slug, key_id = %stored.id, "API key stored");

        Ok(StoredApiKey {
            key: ApiKeyView::from_key(&stored, Some(plugin.name)),
            generated_key,
            generated_secret,
        })
    }

    /// Delete one of the caller's keys.
    pub async fn delete(&self, ctx: &RequestContext, id: ApiKeyId) -> Result<(), AppError> {
        if !self.api_keys.delete(id, ctx.user_id).await? {
            return Err(AppError::not_found("API key not found"));
        }
        info!(user_id = %ctx.user_id, key_id = %id, "API key deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_hint() {
        assert_eq!(display_hint("short"), "");
        assert_eq!(display_hint("abcdefgh1234"), "1234");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" x ".into())).as_deref(), Some("x"));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_request_defaults() {
        let req: StoreApiKeyRequest = serde_json::from_value(serde_json::json!({
            "plugin_id": "0b0a1c5e-4d2f-4a7e-9a53-2a0c9d9b2f11",
            "api_key": "rbg-123456789"
        }))
        .unwrap();
        assert_eq!(req.api_key.as_deref(), Some("rbg-123456789"));
        assert!(req.environment.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_field_lengths() {
        let req = StoreApiKeyRequest {
            name: Some("n".repeat(101)),
            api_url: Some(format!("https://{}", "a".repeat(256))),
            ..Default::default()
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("api_url"));
        assert!(!fields.contains_key("api_key"));
    }

    #[test]
    fn test_masked_view() {
        let now = Utc::now();
        let key = ApiKey {
            id: ApiKeyId::new(),
            user_id: abdullahhub_core::types::UserId::new(),
            plugin_id: PluginId::new(),
            name: Some("main".into()),
            api_key_encrypted: "enc".into(),
            api_secret_encrypted: None,
            key_hash: "h".into(),
            key_hint: "wxyz".into(),
            api_url: None,
            environment: KeyEnvironment::Sandbox,
            is_active: true,
            usage_count: 2,
            last_used: None,
            rate_limit: 100,
            expires_at: None,
            created_at: now,
            updated_at: now,
        };
        let view = ApiKeyView::from_key(&key, Some("Remove Background".into()));
        assert_eq!(view.api_key, "********wxyz");
        assert!(!view.has_secret);
        assert!(view.is_active);
    }
}
