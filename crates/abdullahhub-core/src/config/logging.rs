//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format: `"json"` or `"pretty"`.
    #[serde(default = "default_format")]
    pub format: String,
    /// Path to the application log file. Empty disables file logging.
    #[serde(default = "default_file")]
    pub file: String,
    /// Number of trailing lines returned by the admin system view.
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            file: default_file(),
            tail_lines: default_tail_lines(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

fn default_file() -> String {
    "storage/logs/app.log".to_string()
}

fn default_tail_lines() -> usize {
    100
}
