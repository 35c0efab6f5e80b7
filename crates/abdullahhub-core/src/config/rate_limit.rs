//! Rate limiting configuration.

use serde::{Deserialize, Serialize};

/// A single limit: `requests` per `per_seconds` window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// Burst size and number of requests per window.
    pub requests: u32,
    /// Window length in seconds.
    pub per_seconds: u64,
}

impl RateLimitRule {
    /// Create a rule.
    pub const fn new(requests: u32, per_seconds: u64) -> Self {
        Self {
            requests,
            per_seconds,
        }
    }

    /// Tokens regained per second.
    pub fn refill_rate(&self) -> f64 {
        self.requests as f64 / self.per_seconds.max(1) as f64
    }
}

/// Per-route rate limits, keyed by client IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Master switch.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Default hourly limit applied to every route.
    #[serde(default = "default_hourly")]
    pub default_hourly: RateLimitRule,
    /// Default daily limit applied to every route.
    #[serde(default = "default_daily")]
    pub default_daily: RateLimitRule,
    /// `POST /plugins/install/{id}`.
    #[serde(default = "default_install")]
    pub install: RateLimitRule,
    /// `POST /plugins/execute/{id}`.
    #[serde(default = "default_execute")]
    pub execute: RateLimitRule,
    /// `GET /api/v1/plugins`.
    #[serde(default = "default_public_list")]
    pub public_list: RateLimitRule,
    /// `POST /api/v1/execute`.
    #[serde(default = "default_execute")]
    pub public_execute: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_hourly: default_hourly(),
            default_daily: default_daily(),
            install: default_install(),
            execute: default_execute(),
            public_list: default_public_list(),
            public_execute: default_execute(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_hourly() -> RateLimitRule {
    RateLimitRule::new(50, 3600)
}

fn default_daily() -> RateLimitRule {
    RateLimitRule::new(200, 86_400)
}

fn default_install() -> RateLimitRule {
    RateLimitRule::new(10, 3600)
}

fn default_execute() -> RateLimitRule {
    RateLimitRule::new(30, 60)
}

fn default_public_list() -> RateLimitRule {
    RateLimitRule::new(60, 60)
}
