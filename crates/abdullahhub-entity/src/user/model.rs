//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use abdullahhub_core::types::UserId;

/// A registered AbdullahHub account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the email address has been confirmed.
    pub is_verified: bool,
    /// Administrator flag.
    pub is_admin: bool,
    /// Deactivated accounts cannot authenticate.
    pub is_active: bool,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Last successful authentication.
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Whole days since the account was created.
    pub fn account_age_days(&self) -> i64 {
        (Utc::now() - self.created_at).num_days().max(0)
    }
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Desired username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Pre-hashed password.
    pub password_hash: String,
    /// Grant admin rights.
    pub is_admin: bool,
    /// Mark the email as already verified.
    pub is_verified: bool,
}

/// Dashboard counters for a single user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStats {
    /// Number of installed plugins.
    pub plugins_installed: i64,
    /// Number of active installations.
    pub active_plugins: i64,
    /// Number of stored API keys.
    pub api_keys: i64,
    /// Sum of usage counters across installations.
    pub api_calls: i64,
    /// Days since registration.
    pub account_age_days: i64,
}
