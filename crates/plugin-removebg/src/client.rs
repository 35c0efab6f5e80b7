//! Thin HTTP client for the remove.bg API.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use abdullahhub_core::config::RemoveBgConfig;

use crate::error::RemoveBgError;

/// A processed image.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedBackground {
    /// `data:image/png;base64,...` URL of the result.
    pub image: String,
    /// Detected format name, upper-case (`PNG`).
    pub format: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Value of the `X-Credits-Charged` response header.
    pub credits_charged: String,
}

/// Output options forwarded to remove.bg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOptions {
    /// `size` form field.
    pub size: String,
    /// `type` form field.
    pub kind: String,
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            size: "auto".to_string(),
            kind: "auto".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrors {
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    title: String,
}

/// Calls remove.bg and fetches remote images.
#[derive(Debug, Clone)]
pub struct RemoveBgClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RemoveBgClient {
    /// Build a client from the integration settings.
    pub fn new(config: &RemoveBgConfig) -> Result<Self, RemoveBgError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Download an image from `url`.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoveBgError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoveBgError::Download(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Send `image` to remove.bg and decode the result.
    pub async fn remove_background(
        &self,
        image: Vec<u8>,
        api_key: &str,
        options: &RemovalOptions,
    ) -> Result<RemovedBackground, RemoveBgError> {
        let form = Form::new()
            .part("image_file", Part::bytes(image).file_name("image.png"))
            .text("size", options.size.clone())
            .text("type", options.kind.clone());

        let response = self
            .http
            .post(&self.endpoint)
            .header("X-Api-Key", api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let fallback = format!("API Error: {}", status.as_u16());
            let body = response.bytes().await.unwrap_or_default();
            return Err(RemoveBgError::Api(api_error_title(&body).unwrap_or(fallback)));
        }

        let credits_charged = response
            .headers()
            .get("X-Credits-Charged")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("Unknown")
            .to_string();
        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), credits = %credits_charged, "remove.bg answered");

        describe(&bytes, credits_charged)
    }
}

/// Title of the first error in a remove.bg error body.
fn api_error_title(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ApiErrors>(body)
        .ok()?
        .errors
        .into_iter()
        .next()
        .map(|e| e.title)
}

/// Inspect result bytes and wrap them as a data URL.
pub fn describe(bytes: &[u8], credits_charged: String) -> Result<RemovedBackground, RemoveBgError> {
    let format = image::guess_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    Ok(RemovedBackground {
        image: format!("data:image/png;base64,{}", STANDARD.encode(bytes)),
        format: format!("{format:?}").to_uppercase(),
        width: decoded.width(),
        height: decoded.height(),
        credits_charged,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_describe_png() {
        let bytes = png(3, 2);
        let result = describe(&bytes, "1".into()).unwrap();
        assert_eq!(result.format, "PNG");
        assert_eq!((result.width, result.height), (3, 2));
        assert!(result.image.starts_with("data:image/png;base64,"));
        assert_eq!(result.credits_charged, "1");
    }

    #[test]
    fn test_describe_garbage() {
        assert!(matches!(
            describe(b"not an image", "0".into()),
            Err(RemoveBgError::Image(_))
        ));
    }

    #[test]
    fn test_api_error_title() {
        let body = br#"{"errors":[{"title":"Insufficient credits","code":"insufficient_credits"}]}"#;
        assert_eq!(api_error_title(body).as_deref(), Some("Insufficient credits"));
        assert_eq!(api_error_title(b"<html>"), None);
        assert_eq!(api_error_title(br#"{"errors":[]}"#), None);
    }
}
