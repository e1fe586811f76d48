//! Fetch-and-encode preflight for image payloads

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::MediaError;
use crate::sniff::{detect_mime, is_data_uri, is_http_url, is_supported_format};

/// Fetch budget for image downloads
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Image send request body as the upstream expects it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendImageBody {
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "Caption", default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Image preflight: validates and transcodes image references into
/// `data:` URIs the upstream accepts.
#[derive(Clone)]
pub struct MediaPreflight {
    client: reqwest::Client,
}

impl Default for MediaPreflight {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaPreflight {
    /// Create a preflight with its own HTTP client
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("failed to build media http client");
        Self { client }
    }

    /// Resolve an image reference into a `data:` URI.
    ///
    /// Data URIs pass through untouched. `.svg` URLs are rejected before
    /// any fetch. Other URLs are downloaded, sniffed, validated and
    /// base64-encoded.
    pub async fn prepare_image(&self, image: &str) -> Result<String, MediaError> {
        if is_data_uri(image) {
            return Ok(image.to_string());
        }

        if image.to_ascii_lowercase().ends_with(".svg") {
            return Err(MediaError::SvgNotSupported);
        }

        if !is_http_url(image) {
            return Err(MediaError::InvalidUrl(image.to_string()));
        }

        self.fetch_and_encode(image).await
    }

    /// Download an image and re-encode it as `data:<mime>;base64,<b64>`.
    pub async fn fetch_and_encode(&self, url: &str) -> Result<String, MediaError> {
        tracing::debug!(url, "downloading image for preflight");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::Fetch(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(MediaError::FetchStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            // "image/png; charset=..." style parameters are not part of the type
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::Fetch(e.to_string()))?;

        let mime = match content_type.filter(|ct| !ct.is_empty()) {
            Some(ct) => ct,
            None => detect_mime(&bytes).to_string(),
        };

        if !is_supported_format(&mime) {
            return Err(MediaError::UnsupportedFormat(mime));
        }

        let encoded = STANDARD.encode(&bytes);
        tracing::debug!(url, mime = %mime, bytes = bytes.len(), "image transcoded to data uri");

        Ok(format!("data:{mime};base64,{encoded}"))
    }

    /// Rewrite a `/chat/send/image` request body in place.
    ///
    /// Returns `None` when nothing changed: the body did not parse as an
    /// image request, or the image needs no conversion. A parse failure is
    /// deliberately not an error so unrelated payload shapes pass through
    /// to the upstream untouched.
    pub async fn rewrite_send_body(&self, body: &[u8]) -> Result<Option<Vec<u8>>, MediaError> {
        let mut request: SendImageBody = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(_) => return Ok(None),
        };

        if request.image.is_empty()
            || is_data_uri(&request.image)
            || !is_http_url(&request.image)
        {
            // Still enforce the SVG extension rule before passthrough
            if request.image.to_ascii_lowercase().ends_with(".svg") {
                return Err(MediaError::SvgNotSupported);
            }
            return Ok(None);
        }

        request.image = self.prepare_image(&request.image).await?;

        let rewritten =
            serde_json::to_vec(&request).map_err(|e| MediaError::Serialize(e.to_string()))?;
        Ok(Some(rewritten))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_data_uri_passes_through() {
        let preflight = MediaPreflight::new();
        let uri = "data:image/png;base64,iVBORw0KGgo=";
        assert_eq!(preflight.prepare_image(uri).await.unwrap(), uri);
    }

    #[tokio::test]
    async fn test_svg_extension_rejected_without_fetch() {
        let preflight = MediaPreflight::new();
        let err = preflight
            .prepare_image("https://cdn.example.com/logo.SVG")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::SvgNotSupported));
        assert!(err.to_string().starts_with("SVG images are not supported"));
    }

    #[tokio::test]
    async fn test_non_url_rejected() {
        let preflight = MediaPreflight::new();
        let err = preflight.prepare_image("ftp://host/x.png").await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_unparseable_body_passes_through() {
        let preflight = MediaPreflight::new();
        let body = br#"{"something": "else"}"#;
        assert!(preflight.rewrite_send_body(body).await.unwrap().is_none());

        let body = b"not json at all";
        assert!(preflight.rewrite_send_body(body).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_data_uri_body_not_rewritten() {
        let preflight = MediaPreflight::new();
        let body = serde_json::to_vec(&SendImageBody {
            phone: "628111".into(),
            image: "data:image/jpeg;base64,AAAA".into(),
            caption: Some("hi".into()),
        })
        .unwrap();

        assert!(preflight.rewrite_send_body(&body).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_svg_body_rejected() {
        let preflight = MediaPreflight::new();
        let body = serde_json::to_vec(&SendImageBody {
            phone: "628111".into(),
            image: "files/logo.svg".into(),
            caption: None,
        })
        .unwrap();

        let err = preflight.rewrite_send_body(&body).await.unwrap_err();
        assert!(matches!(err, MediaError::SvgNotSupported));
    }

    #[test]
    fn test_caption_omitted_when_absent() {
        let body = SendImageBody {
            phone: "628111".into(),
            image: "data:image/png;base64,AAAA".into(),
            caption: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("Caption").is_none());
        assert_eq!(json["Phone"], "628111");
    }
}
