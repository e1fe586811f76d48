//! Hermes Client - upstream WhatsApp HTTP client
//!
//! One client, three call shapes:
//! - transparent proxy calls that preserve method, query, headers and body
//! - admin calls carrying the bare `Authorization: <admin-token>` header
//! - session calls carrying the `token: <session-token>` header
//!
//! Message sends parse the upstream `{code, success, message, data}`
//! envelope and classify failures so the campaign dispatcher can pick its
//! backoff.

pub mod config;
pub mod envelope;
pub mod error;
pub mod proxy;

use std::time::Duration;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::envelope::{parse_send_response, SendSuccess, SessionData};
use crate::error::ClientError;

/// Client for the upstream WhatsApp service
#[derive(Clone)]
pub struct WaClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl WaClient {
    /// Create a client from configuration
    pub fn new(config: ClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .build()
            .expect("failed to build upstream http client");
        Self { config, http }
    }

    /// The configured upstream base URL (no trailing slash)
    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    /// JSON call with the bare admin `Authorization` header.
    ///
    /// Returns the raw status and body so callers can relay upstream
    /// responses unchanged.
    pub async fn admin_json(
        &self,
        method: http::Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<(u16, Vec<u8>), ClientError> {
        let mut request = self
            .http
            .request(method, self.url_for(path))
            .header("Authorization", self.config.admin_token())
            .header("Content-Type", "application/json")
            .timeout(self.config.request_timeout());

        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(ClientError::from)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(ClientError::from)?;

        Ok((status, body.to_vec()))
    }

    /// JSON call with a session `token` header
    pub async fn token_json(
        &self,
        method: http::Method,
        path: &str,
        token: &str,
        payload: Option<&Value>,
    ) -> Result<(u16, Vec<u8>), ClientError> {
        let mut request = self
            .http
            .request(method, self.url_for(path))
            .header("token", token)
            .header("Content-Type", "application/json")
            .timeout(self.config.request_timeout());

        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(ClientError::from)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(ClientError::from)?;

        Ok((status, body.to_vec()))
    }

    /// Send one chat message and interpret the upstream envelope.
    ///
    /// Uses the long (bulk) timeout: campaign sends tolerate a slower
    /// upstream rather than burn retries.
    pub async fn send_message(
        &self,
        endpoint: &str,
        token: &str,
        payload: &Value,
    ) -> Result<SendSuccess, ClientError> {
        self.send_message_with_timeout(endpoint, token, payload, self.config.bulk_timeout())
            .await
    }

    /// Send one chat message with an explicit timeout
    pub async fn send_message_with_timeout(
        &self,
        endpoint: &str,
        token: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<SendSuccess, ClientError> {
        let response = self
            .http
            .post(self.url_for(endpoint))
            .header("token", token)
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(ClientError::from)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(ClientError::from)?;

        parse_send_response(status, &body)
    }

    /// Best-effort typing indicator before a send; failures are ignored
    /// by callers.
    pub async fn chat_presence(&self, token: &str, state: &str) -> Result<(), ClientError> {
        let payload = serde_json::json!({ "state": state });
        let (status, body) = self
            .token_json(http::Method::POST, "/chat/presence", token, Some(&payload))
            .await?;

        if !(200..300).contains(&status) {
            return Err(ClientError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(())
    }

    /// Parse session fields out of a 2xx `/session/**` response body.
    ///
    /// Returns `None` when the body carries no session id; parse failures
    /// are non-fatal by contract.
    pub fn parse_session_body(body: &[u8]) -> Option<SessionData> {
        envelope::parse_session_body(body)
    }
}
