//! Mail delivery errors.

use thiserror::Error;

use abdullahhub_core::error::{AppError, ErrorKind};

/// Failure to build or deliver a message.
#[derive(Debug, Error)]
pub enum MailError {
    /// A sender or recipient address did not parse.
    #[error("Invalid email address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    /// The message could not be assembled.
    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    /// The SMTP relay refused or failed.
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::InvalidAddress { .. } => AppError::validation(err.to_string()),
            other => AppError::with_source(ErrorKind::ExternalService, other.to_string(), other),
        }
    }
}
