//! MIME detection from magic bytes

/// PNG signature
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// JPEG signature
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Detect the MIME type of an image from its leading bytes.
///
/// Recognizes PNG, JPEG, GIF (87a/89a), WEBP and SVG (`<?xml` / `<svg`).
/// Anything else is `application/octet-stream`.
pub fn detect_mime(data: &[u8]) -> &'static str {
    if data.len() < 8 {
        return "application/octet-stream";
    }

    if data.starts_with(PNG_MAGIC) {
        return "image/png";
    }
    if data.starts_with(JPEG_MAGIC) {
        return "image/jpeg";
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif";
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }
    if data.starts_with(b"<?xml") || data.starts_with(b"<svg") {
        return "image/svg+xml";
    }

    "application/octet-stream"
}

/// Formats the upstream can deliver. Notably excludes `image/svg+xml`.
pub fn is_supported_format(mime: &str) -> bool {
    matches!(
        mime.to_ascii_lowercase().as_str(),
        "image/png" | "image/jpeg" | "image/jpg" | "image/gif" | "image/webp"
    )
}

/// Whether the payload is already a `data:` URI
pub fn is_data_uri(s: &str) -> bool {
    s.starts_with("data:")
}

/// Whether the payload is a fetchable http(s) URL
pub fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_signature() {
        let data = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
        assert_eq!(detect_mime(&data), "image/png");
    }

    #[test]
    fn test_jpeg_signature() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(detect_mime(&data), "image/jpeg");
    }

    #[test]
    fn test_gif_signatures() {
        assert_eq!(detect_mime(b"GIF87a..trailer.."), "image/gif");
        assert_eq!(detect_mime(b"GIF89a..trailer.."), "image/gif");
    }

    #[test]
    fn test_webp_signature() {
        let mut data = Vec::from(&b"RIFF"[..]);
        data.extend_from_slice(&[0x10, 0x00, 0x00, 0x00]);
        data.extend_from_slice(b"WEBPVP8 ");
        assert_eq!(detect_mime(&data), "image/webp");
    }

    #[test]
    fn test_svg_signatures() {
        assert_eq!(detect_mime(b"<?xml version=\"1.0\"?>"), "image/svg+xml");
        assert_eq!(detect_mime(b"<svg xmlns=\"...\">"), "image/svg+xml");
    }

    #[test]
    fn test_short_input_falls_back() {
        assert_eq!(detect_mime(&[0xFF, 0xD8]), "application/octet-stream");
    }

    #[test]
    fn test_unknown_bytes_fall_back() {
        assert_eq!(detect_mime(b"PLAINTEXT!"), "application/octet-stream");
    }

    #[test]
    fn test_supported_formats() {
        assert!(is_supported_format("image/png"));
        assert!(is_supported_format("image/JPEG"));
        assert!(is_supported_format("image/jpg"));
        assert!(is_supported_format("image/gif"));
        assert!(is_supported_format("image/webp"));
        assert!(!is_supported_format("image/svg+xml"));
        assert!(!is_supported_format("application/octet-stream"));
        assert!(!is_supported_format("image/tiff"));
    }

    #[test]
    fn test_uri_classifiers() {
        assert!(is_data_uri("data:image/png;base64,AAAA"));
        assert!(!is_data_uri("https://x/y.png"));
        assert!(is_http_url("https://x/y.png"));
        assert!(is_http_url("http://x/y.png"));
        assert!(!is_http_url("ftp://x/y.png"));
    }
}
