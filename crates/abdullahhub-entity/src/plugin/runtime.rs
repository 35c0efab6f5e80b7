//! How a plugin's entry point is invoked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plugin runtime kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plugin_runtime", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PluginRuntime {
    /// Compiled into the server and registered through a factory.
    Builtin,
    /// External executable speaking JSON over stdin/stdout.
    #[default]
    Command,
}

impl PluginRuntime {
    /// Return the runtime as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for PluginRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PluginRuntime {
    type Err = abdullahhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "builtin" => Ok(Self::Builtin),
            "command" => Ok(Self::Command),
            _ => Err(abdullahhub_core::AppError::validation(format!(
                "Invalid plugin runtime: '{s}'. Expected one of: builtin, command"
            ))),
        }
    }
}
