//! Plugin system configuration.

use serde::{Deserialize, Serialize};

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Directory containing one sub-directory per installed plugin.
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Scratch space for uploads and per-execution working directories.
    #[serde(default = "default_temp_directory")]
    pub temp_directory: String,
    /// Load every plugin found in `directory` on startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,
    /// Upper bound on a single execution.
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_seconds: u64,
    /// Maximum bytes a command plugin may write to stdout.
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,
    /// Maximum size of an uploaded plugin package.
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
    /// Accepted package extensions.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// JSON-lines file receiving one entry per execution.
    #[serde(default = "default_execution_log")]
    pub execution_log: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            temp_directory: default_temp_directory(),
            auto_load: true,
            execution_timeout_seconds: default_execution_timeout(),
            max_output_bytes: default_max_output(),
            max_upload_bytes: default_max_upload(),
            allowed_extensions: default_allowed_extensions(),
            execution_log: default_execution_log(),
        }
    }
}

fn default_directory() -> String {
    "plugins/installed".to_string()
}

fn default_temp_directory() -> String {
    "plugins/temp".to_string()
}

fn default_true() -> bool {
    true
}

fn default_execution_timeout() -> u64 {
    30
}

fn default_max_output() -> usize {
    16 * 1024 * 1024
}

fn default_max_upload() -> usize {
    50 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    ["py", "js", "json", "zip", "tar.gz", "tgz"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn default_execution_log() -> String {
    "storage/logs/plugin_executions.log".to_string()
}
