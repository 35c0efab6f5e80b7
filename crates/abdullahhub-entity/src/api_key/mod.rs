//! Stored third-party API credentials.

pub mod environment;
pub mod model;

pub use environment::KeyEnvironment;
pub use model::{ApiKey, UpsertApiKey};
