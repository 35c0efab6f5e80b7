//! Errors raised while removing a background.
//!
//! Every variant is reported to the caller as a declined execution
//! (`success: false`) rather than a plugin crash.

use thiserror::Error;

/// Failure modes of one remove.bg request.
#[derive(Debug, Error)]
pub enum RemoveBgError {
    /// Neither the caller nor the server has a key.
    #[error("API key required. Please configure Remove.bg API key in plugin settings.")]
    MissingApiKey,

    /// The input carries no image.
    #[error("No image provided. Please provide image data or URL.")]
    MissingImage,

    /// The image URL answered with a non-success status.
    #[error("Failed to download image from URL: {0}")]
    Download(u16),

    /// The inline image is not valid base64.
    #[error("Processing failed: invalid base64 image data ({0})")]
    Decode(#[from] base64::DecodeError),

    /// remove.bg rejected the request.
    #[error("{0}")]
    Api(String),

    /// Transport failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The returned bytes are not a readable image.
    #[error("Processing failed: {0}")]
    Image(#[from] image::ImageError),
}
