//! Concrete repositories, one per table.

pub mod api_key;
pub mod installation;
pub mod plugin;
pub mod user;

pub use api_key::ApiKeyRepository;
pub use installation::InstallationRepository;
pub use plugin::PluginRepository;
pub use user::UserRepository;

use abdullahhub_core::error::{AppError, ErrorKind};

/// Map a sqlx error to `AppError`, turning the named unique constraint
/// into a conflict with `conflict_message`.
pub(crate) fn map_unique(
    err: sqlx::Error,
    constraint: &str,
    conflict_message: impl Into<String>,
    context: &'static str,
) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some(constraint) => {
            AppError::conflict(conflict_message)
        }
        other => AppError::with_source(ErrorKind::Database, context, other),
    }
}

/// Wrap a sqlx error with context.
pub(crate) fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}
