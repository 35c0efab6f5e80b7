//! Delivery backends.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use abdullahhub_core::config::MailConfig;

use crate::error::MailError;
use crate::templates::RenderedEmail;

/// A message ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Sender mailbox, `Name <address>`.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Rendered content.
    pub content: RenderedEmail,
}

impl OutgoingEmail {
    /// Assemble a multipart/alternative message.
    pub fn to_message(&self) -> Result<Message, MailError> {
        let from = parse_mailbox(&self.from)?;
        let to = parse_mailbox(&self.to)?;
        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(self.content.text.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(self.content.html.clone()),
            );

        Ok(Message::builder()
            .from(from)
            .to(to)
            .subject(self.content.subject.clone())
            .multipart(body)?)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|source| MailError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

/// Something that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait MailTransport: Send + Sync + std::fmt::Debug {
    /// Deliver one message.
    async fn deliver(&self, email: &OutgoingEmail) -> Result<(), MailError>;

    /// Short backend name for logs.
    fn kind(&self) -> &'static str;
}

/// SMTP relay backend.
#[derive(Clone)]
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
    server: String,
}

impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("server", &self.server)
            .finish()
    }
}

impl SmtpTransport {
    /// Build a relay transport. STARTTLS is used when `use_tls` is set.
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
        };
        let inner = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            inner,
            server: format!("{}:{}", config.server, config.port),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = email.to_message()?;
        self.inner.send(message).await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "smtp"
    }
}

/// Backend used when mail is disabled or unconfigured: logs and drops.
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.content.subject, "Mail not configured, email dropped");
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "log"
    }
}
