//! # abdullahhub-entity
//!
//! Domain entity models for AbdullahHub. Every struct in this crate
//! represents a database table row or a domain value object. Database
//! entities derive `sqlx::FromRow`.

pub mod api_key;
pub mod installation;
pub mod plugin;
pub mod user;
