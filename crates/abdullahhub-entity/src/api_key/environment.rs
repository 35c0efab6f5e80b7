//! Credential environment enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which remote environment a stored credential targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "key_environment", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KeyEnvironment {
    /// Test credentials.
    Sandbox,
    /// Live credentials.
    #[default]
    Production,
}

impl fmt::Display for KeyEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sandbox => write!(f, "sandbox"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl FromStr for KeyEnvironment {
    type Err = abdullahhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            _ => Err(abdullahhub_core::AppError::validation(format!(
                "Invalid environment: '{s}'. Expected one of: sandbox, production"
            ))),
        }
    }
}
