//! Request-scoped execution context handed to a plugin.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An uploaded file forwarded to a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFile {
    /// Client-supplied file name.
    pub filename: String,
    /// MIME type, if the client sent one.
    pub content_type: Option<String>,
    /// Base64-encoded content.
    pub data: String,
}

/// The mapping passed to a plugin's entry point.
///
/// Command plugins receive it serialized as one JSON object on stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Calling user.
    pub user_id: String,
    /// Database ID of the plugin.
    pub plugin_id: String,
    /// Input payload.
    pub input: Map<String, Value>,
    /// Uploaded files keyed by form field name.
    pub files: BTreeMap<String, InputFile>,
    /// Credential stored for this user and plugin, if any.
    pub api_key: Option<String>,
    /// Installation configuration merged over the plugin defaults.
    pub config: Value,
    /// When the execution started.
    pub timestamp: DateTime<Utc>,
}

impl ExecutionContext {
    /// Context with no files, key, or configuration.
    pub fn new(user_id: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            plugin_id: plugin_id.into(),
            input: Map::new(),
            files: BTreeMap::new(),
            api_key: None,
            config: Value::Object(Map::new()),
            timestamp: Utc::now(),
        }
    }

    /// Replace the input payload. Non-object values are wrapped as `{"value": v}`.
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = match input {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                map
            }
        };
        self
    }

    /// Attach uploaded files.
    pub fn with_files(mut self, files: BTreeMap<String, InputFile>) -> Self {
        self.files = files;
        self
    }

    /// Attach the stored credential.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    /// Attach the effective configuration.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// A string field of the input payload.
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_builder() {
        let ctx = ExecutionContext::new("u1", "p1")
            .with_input(json!({"image": "https://example.com/cat.png"}))
            .with_api_key(Some(String::new()));
        assert_eq!(ctx.input_str("image"), Some("https://example.com/cat.png"));
        assert!(ctx.api_key.is_none());
    }

    #[test]
    fn test_scalar_input_is_wrapped() {
        let ctx = ExecutionContext::new("u", "p").with_input(json!("hello"));
        assert_eq!(ctx.input_str("value"), Some("hello"));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ExecutionContext::new("u", "p")).unwrap();
        for key in ["user_id", "plugin_id", "input", "files", "api_key", "config", "timestamp"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
