//! HTTP integration tests.
//!
//! Tests marked `#[ignore]` need PostgreSQL at `TEST_DATABASE_URL`:
//! `cargo test --test integration -- --ignored`.

mod helpers;

mod admin_test;
mod api_key_test;
mod http_test;
mod plugin_test;
