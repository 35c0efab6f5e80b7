//! Third-party integrations and feature flags.

use serde::{Deserialize, Serialize};

/// Settings for external APIs used by bundled plugins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    /// remove.bg settings.
    #[serde(default)]
    pub removebg: RemoveBgConfig,
}

/// remove.bg API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveBgConfig {
    /// Fallback API key (`REMOVEBG_API_KEY`) used when the caller has none stored.
    #[serde(default)]
    pub api_key: String,
    /// API endpoint.
    #[serde(default = "default_removebg_endpoint")]
    pub endpoint: String,
    /// HTTP timeout for calls to the API.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for RemoveBgConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_removebg_endpoint(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Feature flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Send account emails.
    #[serde(default = "default_true")]
    pub email_notifications: bool,
    /// Approve uploaded plugins without admin review.
    #[serde(default)]
    pub auto_approve_plugins: bool,
    /// Reserved; the server refuses to start with it enabled.
    #[serde(default)]
    pub payments: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            email_notifications: true,
            auto_approve_plugins: false,
            payments: false,
        }
    }
}

fn default_removebg_endpoint() -> String {
    "https://api.remove.bg/v1.0/removebg".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
