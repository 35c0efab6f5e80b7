//! # abdullahhub-database
//!
//! PostgreSQL connection management and repository implementations for
//! users, plugins, installations, and stored API keys.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::plugin::{MarketplaceQuery, PluginCounts};
