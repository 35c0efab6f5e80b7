//! The `removebg` builtin plugin.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::{info, warn};

use abdullahhub_plugin::context::ExecutionContext;
use abdullahhub_plugin::{Invocation, Plugin, PluginError, output};

use crate::client::{RemovalOptions, RemoveBgClient};
use crate::error::RemoveBgError;

/// Where the image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Download from this URL.
    Url(String),
    /// Inline bytes.
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Resolve the image from `input.image` (URL, data URL, or base64), then
    /// from an uploaded `image` file.
    pub fn from_context(context: &ExecutionContext) -> Result<Self, RemoveBgError> {
        if let Some(image) = context.input_str("image").filter(|s| !s.trim().is_empty()) {
            let image = image.trim();
            if image.starts_with("http://") || image.starts_with("https://") {
                return Ok(Self::Url(image.to_string()));
            }
            return Ok(Self::Bytes(decode_inline(image)?));
        }

        match context.files.get("image") {
            Some(file) => Ok(Self::Bytes(STANDARD.decode(file.data.trim())?)),
            None => Err(RemoveBgError::MissingImage),
        }
    }
}

/// Decode base64, dropping a `data:...;base64,` prefix.
fn decode_inline(data: &str) -> Result<Vec<u8>, RemoveBgError> {
    let payload = match data.split_once(',') {
        Some((_, rest)) => rest,
        None => data,
    };
    Ok(STANDARD.decode(payload.trim())?)
}

/// Removes image backgrounds through remove.bg.
#[derive(Debug, Clone)]
pub struct RemoveBgPlugin {
    client: RemoveBgClient,
    fallback_key: Option<String>,
}

impl RemoveBgPlugin {
    /// Create the plugin. `fallback_key` is used when the caller has no
    /// stored key.
    pub fn new(client: RemoveBgClient, fallback_key: Option<String>) -> Self {
        Self {
            client,
            fallback_key: fallback_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn api_key<'a>(&'a self, context: &'a ExecutionContext) -> Result<&'a str, RemoveBgError> {
        context
            .api_key
            .as_deref()
            .or(self.fallback_key.as_deref())
            .ok_or(RemoveBgError::MissingApiKey)
    }

    async fn run(&self, context: &ExecutionContext) -> Result<Value, RemoveBgError> {
        let api_key = self.api_key(context)?;
        let source = ImageSource::from_context(context)?;
        let options = options_from_config(&context.config);

        let bytes = match source {
            ImageSource::Url(url) => self.client.fetch(&url).await?,
            ImageSource::Bytes(bytes) => bytes,
        };

        let result = self
            .client
            .remove_background(bytes, api_key, &options)
            .await?;
        info!(
            user_id = %context.user_id,
            width = result.width,
            height = result.height,
            "Background removed"
        );

        Ok(output::success(json!({
            "image": result.image,
            "format": result.format,
            "width": result.width,
            "height": result.height,
            "credits_charged": result.credits_charged,
            "message": "Background removed successfully!",
        })))
    }
}

fn options_from_config(config: &Value) -> RemovalOptions {
    let field = |key: &str| {
        config
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let defaults = RemovalOptions::default();
    RemovalOptions {
        size: field("size").unwrap_or(defaults.size),
        kind: field("type").unwrap_or(defaults.kind),
    }
}

#[async_trait]
impl Plugin for RemoveBgPlugin {
    async fn execute(&self, invocation: Invocation) -> Result<Value, PluginError> {
        match self.run(&invocation.context).await {
            Ok(body) => Ok(body),
            Err(e) => {
                warn!(user_id = %invocation.context.user_id, error = %e, "Background removal declined");
                Ok(output::failure(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use abdullahhub_core::config::RemoveBgConfig;
    use abdullahhub_plugin::context::InputFile;

    use super::*;

    fn plugin(fallback: Option<&str>) -> RemoveBgPlugin {
        let config = RemoveBgConfig {
            endpoint: "http://127.0.0.1:9/removebg".into(),
            ..RemoveBgConfig::default()
        };
        RemoveBgPlugin::new(
            RemoveBgClient::new(&config).unwrap(),
            fallback.map(str::to_string),
        )
    }

    fn invoke(context: ExecutionContext) -> Invocation {
        Invocation {
            context,
            scratch_dir: PathBuf::from("/tmp"),
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_declined() {
        let ctx = ExecutionContext::new("u", "p").with_input(json!({"image": "aGVsbG8="}));
        let out = plugin(None).execute(invoke(ctx)).await.unwrap();
        assert_eq!(out["success"], false);
        assert_eq!(
            out["error"],
            "API key required. Please configure Remove.bg API key in plugin settings."
        );
    }

    #[tokio::test]
    async fn test_missing_image_is_declined() {
        let ctx = ExecutionContext::new("u", "p").with_api_key(Some("user-key".into()));
        let out = plugin(None).execute(invoke(ctx)).await.unwrap();
        assert_eq!(out["success"], false);
        assert_eq!(
            out["error"],
            "No image provided. Please provide image data or URL."
        );
    }

    #[test]
    fn test_key_precedence() {
        let p = plugin(Some("server-key"));
        let ctx = ExecutionContext::new("u", "p");
        assert_eq!(p.api_key(&ctx).unwrap(), "server-key");
        let ctx = ctx.with_api_key(Some("user-key".into()));
        assert_eq!(p.api_key(&ctx).unwrap(), "user-key");
        assert!(plugin(Some("  ")).api_key(&ExecutionContext::new("u", "p")).is_err());
    }

    #[test]
    fn test_image_sources() {
        let url = ExecutionContext::new("u", "p")
            .with_input(json!({"image": "https://example.com/cat.png"}));
        assert_eq!(
            ImageSource::from_context(&url).unwrap(),
            ImageSource::Url("https://example.com/cat.png".into())
        );

        let data_url = ExecutionContext::new("u", "p")
            .with_input(json!({"image": "data:image/png;base64,aGVsbG8="}));
        assert_eq!(
            ImageSource::from_context(&data_url).unwrap(),
            ImageSource::Bytes(b"hello".to_vec())
        );

        let upload = ExecutionContext::new("u", "p").with_files(BTreeMap::from([(
            "image".to_string(),
            InputFile {
                filename: "cat.png".into(),
                content_type: Some("image/png".into()),
                data: "aGk=".into(),
            },
        )]));
        assert_eq!(
            ImageSource::from_context(&upload).unwrap(),
            ImageSource::Bytes(b"hi".to_vec())
        );

        let bad = ExecutionContext::new("u", "p").with_input(json!({"image": "***"}));
        assert!(matches!(
            ImageSource::from_context(&bad),
            Err(RemoveBgError::Decode(_))
        ));
    }

    #[test]
    fn test_options_from_config() {
        let opts = options_from_config(&json!({"size": "preview", "type": ""}));
        assert_eq!(opts.size, "preview");
        assert_eq!(opts.kind, "auto");
    }
}
