//! Stored third-party credentials.

pub mod service;

pub use service::{ApiKeyService, ApiKeyView, StoreApiKeyRequest, StoredApiKey};
