//! Hermes Media - image payload preflight
//!
//! Applied to requests carrying an image payload before they reach the
//! upstream: data URIs pass through, URLs are fetched (30s budget),
//! sniffed, validated against the formats the upstream can deliver, and
//! re-encoded as `data:<mime>;base64,…`.

pub mod error;
pub mod preflight;
pub mod sniff;

pub use error::MediaError;
pub use preflight::{MediaPreflight, SendImageBody};
pub use sniff::{detect_mime, is_data_uri, is_http_url, is_supported_format};
