//! Message templates.

/// A rendered message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    /// Subject line.
    pub subject: String,
    /// Plain-text part.
    pub text: String,
    /// HTML part.
    pub html: String,
}

/// Every message the platform sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailTemplate {
    /// An administrator created an account.
    AccountCreated { username: String },
    /// The user installed a plugin.
    PluginInstalled { username: String, plugin_name: String },
    /// An uploaded plugin was approved.
    PluginApproved { plugin_name: String },
    /// An uploaded plugin was rejected.
    PluginRejected { plugin_name: String },
}

impl EmailTemplate {
    /// Template identifier, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AccountCreated { .. } => "account_created",
            Self::PluginInstalled { .. } => "plugin_installed",
            Self::PluginApproved { .. } => "plugin_approved",
            Self::PluginRejected { .. } => "plugin_rejected",
        }
    }

    /// Render subject and bodies.
    pub fn render(&self) -> RenderedEmail {
        let (subject, heading, lines) = match self {
            Self::AccountCreated { username } => (
                "Welcome to AbdullahHub".to_string(),
                format!("Welcome, {username}!"),
                vec![
                    "Your AbdullahHub account has been created.".to_string(),
                    "Browse the marketplace to install your first plugin.".to_string(),
                ],
            ),
            Self::PluginInstalled {
                username,
                plugin_name,
            } => (
                format!("Plugin installed: {plugin_name}"),
                format!("Hi {username},"),
                vec![
                    format!("{plugin_name} is now installed on your account."),
                    "Configure it from the plugin page before running it.".to_string(),
                ],
            ),
            Self::PluginApproved { plugin_name } => (
                format!("Your plugin {plugin_name} was approved"),
                "Good news!".to_string(),
                vec![format!(
                    "{plugin_name} passed review and is now listed in the marketplace."
                )],
            ),
            Self::PluginRejected { plugin_name } => (
                format!("Your plugin {plugin_name} was not approved"),
                "Review result".to_string(),
                vec![
                    format!("{plugin_name} did not pass review and is not listed."),
                    "Contact support for details.".to_string(),
                ],
            ),
        };

        let text = format!("{heading}\n\n{}\n\n- The AbdullahHub Team\n", lines.join("\n"));
        let paragraphs: String = lines
            .iter()
            .map(|l| format!("<p>{}</p>", escape_html(l)))
            .collect();
        let html = format!(
            "<!DOCTYPE html>\n<html>\n<body style=\"font-family: sans-serif;\">\n<h2>{}</h2>\n{paragraphs}\n<p style=\"color: #666; font-size: 12px;\">The AbdullahHub Team</p>\n</body>\n</html>",
            escape_html(&heading)
        );

        RenderedEmail {
            subject,
            text,
            html,
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
