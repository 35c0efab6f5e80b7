//! Authentication and secret configuration.

use serde::{Deserialize, Serialize};

/// Placeholder secret used when nothing is configured.
pub const DEV_SECRET_PLACEHOLDER: &str = "dev-secret-key-change-in-production";

/// Authentication and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Application secret (`SECRET_KEY`). Signs JWTs and derives the
    /// credential encryption key.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Secret used to hash API keys for lookup (`API_KEY_HASH_SECRET`).
    /// Falls back to `secret_key` when empty.
    #[serde(default)]
    pub api_key_hash_secret: String,
    /// Access token TTL in hours.
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl_hours: u64,
    /// Minimum password length.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
}

impl AuthConfig {
    /// The effective secret for API key hashing.
    pub fn effective_hash_secret(&self) -> &str {
        if self.api_key_hash_secret.is_empty() {
            &self.secret_key
        } else {
            &self.api_key_hash_secret
        }
    }

    /// Whether the development placeholder secret is still in use.
    pub fn uses_placeholder_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_PLACEHOLDER
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            api_key_hash_secret: String::new(),
            jwt_access_ttl_hours: default_access_ttl(),
            password_min_length: default_password_min(),
        }
    }
}

fn default_secret_key() -> String {
    DEV_SECRET_PLACEHOLDER.to_string()
}

fn default_access_ttl() -> u64 {
    24
}

fn default_password_min() -> usize {
    8
}
