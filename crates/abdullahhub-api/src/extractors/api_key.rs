//! `X-API-Key` header extractor for the public API.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use abdullahhub_core::error::AppError;

use crate::error::ApiError;

/// Header carrying a client API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The presented API key, trimmed and non-empty.
#[derive(Debug, Clone)]
pub struct ApiKeyHeader(pub String);

impl<S> FromRequestParts<S> for ApiKeyHeader
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .ok_or_else(|| AppError::authentication("API key required").into())
    }
}
