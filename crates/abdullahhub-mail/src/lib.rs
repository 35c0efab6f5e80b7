//! # abdullahhub-mail
//!
//! Templated notification emails. Every message is sent on its own
//! detached task with no retry; failures are logged.

pub mod error;
pub mod mailer;
pub mod templates;
pub mod transport;

pub use error::MailError;
pub use mailer::Mailer;
pub use templates::{EmailTemplate, RenderedEmail};
pub use transport::{LogTransport, MailTransport, OutgoingEmail, SmtpTransport};
