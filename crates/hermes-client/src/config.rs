//! Upstream client configuration

use std::time::Duration;

/// Configuration for the upstream WhatsApp client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    admin_token: String,
    request_timeout: Duration,
    image_timeout: Duration,
    bulk_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with default timeouts (30s requests, 60s
    /// for image and bulk traffic)
    pub fn new(base_url: impl Into<String>, admin_token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            admin_token: admin_token.into(),
            request_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(60),
            bulk_timeout: Duration::from_secs(60),
        }
    }

    /// Override the normal request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the image proxy timeout
    #[must_use]
    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    /// Override the bulk send timeout
    #[must_use]
    pub fn with_bulk_timeout(mut self, timeout: Duration) -> Self {
        self.bulk_timeout = timeout;
        self
    }

    /// Upstream base URL, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Admin credential, sent as a bare `Authorization` header value
    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Timeout for normal proxied requests
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Timeout for image-bearing proxied requests
    pub fn image_timeout(&self) -> Duration {
        self.image_timeout
    }

    /// Timeout for campaign sends
    pub fn bulk_timeout(&self) -> Duration {
        self.bulk_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = ClientConfig::new("https://wa.example.com/", "admin-token");
        assert_eq!(config.base_url(), "https://wa.example.com");
    }

    #[test]
    fn test_default_timeouts() {
        let config = ClientConfig::new("https://wa.example.com", "t");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.image_timeout(), Duration::from_secs(60));
        assert_eq!(config.bulk_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::new("https://wa.example.com", "t")
            .with_request_timeout(Duration::from_secs(5))
            .with_bulk_timeout(Duration::from_secs(90));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.bulk_timeout(), Duration::from_secs(90));
    }
}
