//! Fire-and-forget mail dispatch.

use std::sync::Arc;

use tracing::{error, info, warn};

use abdullahhub_core::config::MailConfig;

use crate::error::MailError;
use crate::templates::EmailTemplate;
use crate::transport::{LogTransport, MailTransport, OutgoingEmail, SmtpTransport};

/// Renders templates and hands them to a transport.
#[derive(Debug, Clone)]
pub struct Mailer {
    transport: Arc<dyn MailTransport>,
    sender: String,
}

impl Mailer {
    /// Create a mailer over an explicit transport.
    pub fn new(transport: Arc<dyn MailTransport>, sender: impl Into<String>) -> Self {
        Self {
            transport,
            sender: sender.into(),
        }
    }

    /// SMTP when configured, otherwise the log-only backend.
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let sender = format!("{} <{}>", config.sender_name, config.sender_email);
        let transport: Arc<dyn MailTransport> = if config.is_configured() {
            Arc::new(SmtpTransport::from_config(config)?)
        } else {
            warn!("Mail credentials missing or mail disabled; emails will only be logged");
            Arc::new(LogTransport)
        };
        info!(transport = transport.kind(), "Mailer ready");
        Ok(Self::new(transport, sender))
    }

    /// A mailer that only logs.
    pub fn disabled() -> Self {
        Self::new(Arc::new(LogTransport), "AbdullahHub Support <support@abdullahhub.com>")
    }

    /// Name of the active backend.
    pub fn transport_kind(&self) -> &'static str {
        self.transport.kind()
    }

    fn compose(&self, to: &str, template: &EmailTemplate) -> OutgoingEmail {
        OutgoingEmail {
            from: self.sender.clone(),
            to: to.to_string(),
            content: template.render(),
        }
    }

    /// Deliver now and report the outcome.
    pub async fn send_now(&self, to: &str, template: EmailTemplate) -> Result<(), MailError> {
        let email = self.compose(to, &template);
        self.transport.deliver(&email).await?;
        info!(to = %to, template = template.name(), "Email sent");
        Ok(())
    }

    /// Deliver on a detached task. Failures are logged and dropped.
    pub fn send(&self, to: &str, template: EmailTemplate) {
        let mailer = self.clone();
        let to = to.to_string();
        tokio::spawn(async move {
            let name = template.name();
            if let Err(e) = mailer.send_now(&to, template).await {
                error!(to = %to, template = name, error = %e, "Failed to send email");
            }
        });
    }
}
