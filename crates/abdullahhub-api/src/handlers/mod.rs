//! Route handlers organized by domain.

pub mod admin;
pub mod api_keys;
pub mod dashboard;
pub mod health;
pub mod plugins;
pub mod public;
