//! Request context carrying the authenticated caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use abdullahhub_core::types::UserId;

/// Who is acting, resolved from the bearer token by the API layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// Username from the token.
    pub username: String,
    /// Administrator flag at token issue time.
    pub is_admin: bool,
    /// Client IP address.
    pub ip_address: String,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        is_admin: bool,
        ip_address: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_admin,
            ip_address: ip_address.into(),
            request_time: Utc::now(),
        }
    }
}
