//! Account administration: creation, roles, status, and tokens.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use abdullahhub_auth::password::{PasswordHasher, PasswordValidator, validate_email};
use abdullahhub_auth::JwtEncoder;
use abdullahhub_core::error::AppError;
use abdullahhub_core::types::{PageRequest, PageResponse};
use abdullahhub_database::repositories::UserRepository;
use abdullahhub_entity::user::{CreateUser, User};
use abdullahhub_mail::{EmailTemplate, Mailer};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 80;
const EMAIL_MAX: usize = 120;

/// Request to create an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Plain password.
    pub password: String,
    /// Grant admin rights.
    #[serde(default)]
    pub is_admin: bool,
}

/// A freshly issued bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// The JWT.
    pub token: String,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
}

/// Reject usernames outside 3..=80 characters or with characters other
/// than ASCII letters, digits, `_`, `-`, and `.`.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::validation(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AppError::validation(
            "Username may only contain letters, digits, '_', '-' and '.'",
        ));
    }
    Ok(())
}

/// Handles administrative user management operations.
#[derive(Debug, Clone)]
pub struct AdminUserService {
    users: Arc<UserRepository>,
    hasher: Arc<PasswordHasher>,
    validator: Arc<PasswordValidator>,
    encoder: Arc<JwtEncoder>,
    mailer: Mailer,
}

impl AdminUserService {
    /// Creates a new admin user service.
    pub fn new(
        users: Arc<UserRepository>,
        hasher: Arc<PasswordHasher>,
        validator: Arc<PasswordValidator>,
        encoder: Arc<JwtEncoder>,
        mailer: Mailer,
    ) -> Self {
        Self {
            users,
            hasher,
            validator,
            encoder,
            mailer,
        }
    }

    /// Create an account and send the welcome email. A failed email is
    /// logged, not returned.
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<User, AppError> {
        let username = req.username.trim();
        let email = req.email.trim().to_lowercase();

        validate_username(username)?;
        if email.len() > EMAIL_MAX {
            return Err(AppError::validation(format!(
                "Email must be at most {EMAIL_MAX} characters"
            )));
        }
        validate_email(&email)?;
        self.validator.validate(&req.password)?;

        if self.users.find_by_username(username).await?.is_some() {
            return Err(AppError::conflict("Username already exists"));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("Email already registered"));
        }

        let password_hash = self.hasher.hash_password(&req.password)?;
        let user = self
            .users
            .create(&CreateUser {
                username: username.to_string(),
                email,
                password_hash,
                is_admin: req.is_admin,
                is_verified: true,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, is_admin = user.is_admin, "User created");

        let welcome = EmailTemplate::AccountCreated {
            username: user.username.clone(),
        };
        if let Err(e) = self.mailer.send_now(&user.email, welcome).await {
            warn!(user_id = %user.id, error = %e, "Failed to send welcome email");
        }

        Ok(user)
    }

    /// One page of users, newest first.
    pub async fn list_users(&self, page: PageRequest) -> Result<PageResponse<User>, AppError> {
        self.users.list(&page.normalized()).await
    }

    /// Look up an account by username.
    pub async fn get_by_username(&self, username: &str) -> Result<User, AppError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))
    }

    /// Grant or revoke admin rights.
    pub async fn set_admin(&self, username: &str, is_admin: bool) -> Result<User, AppError> {
        let user = self.get_by_username(username).await?;
        let updated = self
            .users
            .set_admin(user.id, is_admin)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))?;
        info!(user_id = %updated.id, is_admin, "User role changed");
        Ok(updated)
    }

    /// Activate or deactivate an account.
    pub async fn set_active(&self, username: &str, is_active: bool) -> Result<User, AppError> {
        let user = self.get_by_username(username).await?;
        let updated = self
            .users
            .set_active(user.id, is_active)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))?;
        info!(user_id = %updated.id, is_active, "User status changed");
        Ok(updated)
    }

    /// Issue a bearer token for an active account.
    pub async fn issue_token(
        &self,
        username: &str,
        ttl_hours: Option<i64>,
    ) -> Result<IssuedToken, AppError> {
        let user = self.get_by_username(username).await?;
        if !user.is_active {
            return Err(AppError::authorization("Account is deactivated"));
        }
        let (token, expires_at) = self.encoder.issue(&user, ttl_hours)?;
        self.users.touch_last_login(user.id).await?;
        info!(user_id = %user.id, expires_at = %expires_at, "Token issued");
        Ok(IssuedToken { token, expires_at })
    }
}
