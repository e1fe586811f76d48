//! Transparent proxying to the upstream
//!
//! Method, query string, headers and body are preserved bit-for-bit.
//! `Host` is the one header never forwarded (it names the gateway, not
//! the upstream), and `Content-Length` is recomputed from the outgoing
//! body so a preflight rewrite stays consistent.

use std::time::Duration;

use http::header::{CONTENT_LENGTH, HOST};
use http::{HeaderMap, Method};

use crate::error::ClientError;
use crate::WaClient;

/// A request captured from the caller for forwarding
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Upstream path, already stripped of the gateway prefix
    pub path: String,
    /// Raw query string without the leading `?`, if any
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// The upstream response relayed to the caller unchanged
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl WaClient {
    /// Forward a request to the upstream and return its response verbatim.
    pub async fn proxy(
        &self,
        request: ProxyRequest,
        timeout: Duration,
    ) -> Result<ProxyResponse, ClientError> {
        let mut url = self.url_for(&request.path);
        if let Some(query) = &request.query {
            url.push('?');
            url.push_str(query);
        }

        let mut headers = request.headers;
        headers.remove(HOST);
        headers.remove(CONTENT_LENGTH);

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            body_len = request.body.len(),
            "proxying request upstream"
        );

        let response = self
            .http()
            .request(request.method, url)
            .headers(headers)
            .body(request.body)
            .timeout(timeout)
            .send()
            .await
            .map_err(ClientError::from)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ClientError::from)?;

        Ok(ProxyResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_request_shape() {
        let mut headers = HeaderMap::new();
        headers.insert("token", "wat_secret".parse().unwrap());

        let request = ProxyRequest {
            method: Method::POST,
            path: "/chat/send/text".to_string(),
            query: Some("detail=1".to_string()),
            headers,
            body: b"{}".to_vec(),
        };

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers.get("token").unwrap(), "wat_secret");
    }
}
