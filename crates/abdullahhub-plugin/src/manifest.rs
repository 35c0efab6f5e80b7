//! `plugin.json` manifest.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PluginError;

/// File name of the manifest inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.json";

/// How a plugin's entry point is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// Compiled into the server and resolved through a factory.
    Builtin,
    /// External executable speaking JSON over stdio.
    #[default]
    Command,
}

impl RuntimeKind {
    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Command => "command",
        }
    }
}

/// Entry point of a command plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Executable name or path.
    pub command: String,
    /// Arguments. The working directory is the plugin directory.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Parsed `plugin.json`. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Display name. Falls back to the slug.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Author.
    #[serde(default = "default_author")]
    pub author: String,
    /// Marketplace category.
    #[serde(default = "default_category")]
    pub category: String,
    /// Search tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Runtime kind.
    #[serde(default)]
    pub runtime: RuntimeKind,
    /// Command entry point (command runtime only).
    #[serde(default)]
    pub entry: Option<EntryPoint>,
    /// Executables that must be on `PATH`.
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Names of credentials the plugin expects.
    #[serde(default)]
    pub api_keys_required: Vec<String>,
    /// JSON schema of the configuration.
    #[serde(default = "empty_object")]
    pub config_schema: Value,
    /// Configuration applied before the user's own.
    #[serde(default = "empty_object")]
    pub default_config: Value,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_author() -> String {
    "Unknown".to_string()
}

fn default_category() -> String {
    "General".to_string()
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl PluginManifest {
    /// A manifest with every field defaulted and the name set to `slug`.
    pub fn with_defaults(slug: &str) -> Self {
        Self {
            name: slug.to_string(),
            description: String::new(),
            version: default_version(),
            author: default_author(),
            category: default_category(),
            tags: Vec::new(),
            runtime: RuntimeKind::default(),
            entry: None,
            requirements: Vec::new(),
            api_keys_required: Vec::new(),
            config_schema: empty_object(),
            default_config: empty_object(),
        }
    }

    /// Parse manifest JSON, filling an empty name with `slug`.
    pub fn parse(bytes: &[u8], slug: &str) -> Result<Self, PluginError> {
        let mut manifest: Self = serde_json::from_slice(bytes)
            .map_err(|e| PluginError::InvalidManifest(e.to_string()))?;
        if manifest.name.trim().is_empty() {
            manifest.name = slug.to_string();
        }
        Ok(manifest)
    }

    /// Read `plugin.json` from a plugin directory.
    pub async fn from_dir(dir: &Path, slug: &str) -> Result<Self, PluginError> {
        let bytes = tokio::fs::read(dir.join(MANIFEST_FILE)).await?;
        Self::parse(&bytes, slug)
    }

    /// Structural checks that parsing cannot express.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.runtime == RuntimeKind::Command {
            match &self.entry {
                Some(entry) if !entry.command.trim().is_empty() => {}
                _ => {
                    return Err(PluginError::InvalidManifest(
                        "command plugins must declare entry.command".into(),
                    ));
                }
            }
        }
        if !self.config_schema.is_object() || !self.default_config.is_object() {
            return Err(PluginError::InvalidManifest(
                "config_schema and default_config must be objects".into(),
            ));
        }
        Ok(())
    }
}

/// Whether `slug` is usable as a plugin directory name.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 100
        && !slug.starts_with('.')
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Derive a slug from a display name: lower-case ASCII alphanumerics with
/// every other run of characters collapsed to `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    slug.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let m = PluginManifest::parse(br#"{"entry": {"command": "python3"}}"#, "echo").unwrap();
        assert_eq!(m.name, "echo");
        assert_eq!(m.version, "1.0.0");
        assert_eq!(m.author, "Unknown");
        assert_eq!(m.category, "General");
        assert_eq!(m.runtime, RuntimeKind::Command);
        assert_eq!(m.default_config, json!({}));
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_builtin_manifest() {
        let m = PluginManifest::parse(
            br#"{"name": "Remove Background", "runtime": "builtin", "api_keys_required": ["api_key"]}"#,
            "removebg",
        )
        .unwrap();
        assert_eq!(m.runtime, RuntimeKind::Builtin);
        assert_eq!(m.api_keys_required, vec!["api_key"]);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_command_without_entry_is_invalid() {
        let m = PluginManifest::parse(b"{}", "x").unwrap();
        assert!(matches!(m.validate(), Err(PluginError::InvalidManifest(_))));
    }

    #[test]
    fn test_slugs() {
        assert_eq!(slugify("Remove Background!"), "remove-background");
        assert_eq!(slugify("  QR -- Code  v2 "), "qr-code-v2");
        assert_eq!(slugify("***"), "");
        assert!(is_valid_slug("removebg"));
        assert!(is_valid_slug("my_plugin-1.2"));
        assert!(!is_valid_slug("../etc"));
        assert!(!is_valid_slug("a/b"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            PluginManifest::parse(b"{not json", "x"),
            Err(PluginError::InvalidManifest(_))
        ));
    }
}
