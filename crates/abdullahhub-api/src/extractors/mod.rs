//! Custom Axum extractors.

pub mod api_key;
pub mod auth;
pub mod client_ip;
pub mod execute;
pub mod json;
pub mod pagination;
pub mod path;

pub use api_key::ApiKeyHeader;
pub use auth::{AdminUser, AuthUser};
pub use execute::ExecutePayload;
pub use json::{ApiJson, ValidatedJson};
pub use pagination::PaginationParams;
