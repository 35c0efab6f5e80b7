//! Bearer token creation.

use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use abdullahhub_core::config::AuthConfig;
use abdullahhub_core::error::AppError;
use abdullahhub_entity::user::User;

use super::claims::Claims;

/// Signs HS256 bearer tokens with the application secret.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    default_ttl_hours: i64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("default_ttl_hours", &self.default_ttl_hours)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            default_ttl_hours: config.jwt_access_ttl_hours as i64,
        }
    }

    /// Issue a token for `user`, valid for `ttl_hours` or the configured default.
    pub fn issue(
        &self,
        user: &User,
        ttl_hours: Option<i64>,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let hours = ttl_hours.unwrap_or(self.default_ttl_hours);
        if hours <= 0 {
            return Err(AppError::validation("Token lifetime must be positive"));
        }

        let now = Utc::now();
        let exp = now + chrono::Duration::hours(hours);

        let claims = Claims {
            sub: user.id.into_uuid(),
            username: user.username.clone(),
            admin: user.is_admin,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))?;

        Ok((token, exp))
    }
}
