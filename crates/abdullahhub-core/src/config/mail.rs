//! Outgoing mail configuration.

use serde::{Deserialize, Serialize};

/// SMTP settings used by the mailer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Whether outgoing mail is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// SMTP relay host.
    #[serde(default = "default_server")]
    pub server: String,
    /// SMTP relay port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use STARTTLS on the connection.
    #[serde(default = "default_true")]
    pub use_tls: bool,
    /// SMTP username (`MAIL_USERNAME`).
    #[serde(default)]
    pub username: String,
    /// SMTP password (`MAIL_PASSWORD`).
    #[serde(default)]
    pub password: String,
    /// Display name of the default sender.
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    /// Address of the default sender.
    #[serde(default = "default_sender_email")]
    pub sender_email: String,
}

impl MailConfig {
    /// Whether credentials are present.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.username.is_empty() && !self.password.is_empty()
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server: default_server(),
            port: default_port(),
            use_tls: true,
            username: String::new(),
            password: String::new(),
            sender_name: default_sender_name(),
            sender_email: default_sender_email(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_port() -> u16 {
    587
}

fn default_sender_name() -> String {
    "AbdullahHub Support".to_string()
}

fn default_sender_email() -> String {
    "support@abdullahhub.com".to_string()
}
