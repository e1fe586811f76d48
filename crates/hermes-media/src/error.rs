//! Media preflight errors

use thiserror::Error;

/// Errors surfaced by image preflight
#[derive(Error, Debug)]
pub enum MediaError {
    /// SVG can never be delivered, regardless of how it is referenced
    #[error("SVG images are not supported by WhatsApp. Please use PNG, JPEG, GIF, or WebP format.")]
    SvgNotSupported,

    /// Sniffed or declared format outside the supported set
    #[error("unsupported image format: {0}. WhatsApp supports PNG, JPEG, GIF, and WebP only")]
    UnsupportedFormat(String),

    /// The image reference is not a fetchable URL
    #[error("invalid image URL: {0}")]
    InvalidUrl(String),

    /// Transport failure while downloading
    #[error("failed to download image: {0}")]
    Fetch(String),

    /// Non-200 response from the image host
    #[error("failed to download image: HTTP {0}")]
    FetchStatus(u16),

    /// Rewritten body could not be serialized
    #[error("failed to serialize rewritten body: {0}")]
    Serialize(String),
}

impl From<MediaError> for hermes_types::HermesError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::SvgNotSupported | MediaError::UnsupportedFormat(_) => {
                Self::UnsupportedImageFormat(err.to_string())
            }
            MediaError::InvalidUrl(_) => Self::Validation(err.to_string()),
            MediaError::Fetch(_) | MediaError::FetchStatus(_) => Self::Validation(err.to_string()),
            MediaError::Serialize(msg) => Self::Internal(msg),
        }
    }
}
