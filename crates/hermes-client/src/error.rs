//! Upstream client errors

use thiserror::Error;

/// Errors talking to the upstream WhatsApp service
#[derive(Error, Debug)]
pub enum ClientError {
    /// The upstream did not answer within the timeout
    #[error("Request timeout - WhatsApp server took too long to respond")]
    Timeout,

    /// Transport-level failure reaching the upstream
    #[error("Network connection error - please check connectivity")]
    Connection(String),

    /// Non-2xx upstream response
    #[error("WhatsApp server returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The upstream answered with an HTML page instead of JSON
    #[error("WhatsApp server returned HTML page instead of JSON (possibly server error or wrong endpoint)")]
    HtmlResponse,

    /// The upstream body did not parse as the response envelope
    #[error("Failed to parse JSON response: {detail} (response: {body})")]
    Parse { detail: String, body: String },

    /// Envelope parsed but `success` was false
    #[error("WhatsApp server error: {0}")]
    Rejected(String),
}

impl ClientError {
    /// Whether the failure is a transport problem (timeout/connection).
    /// The campaign dispatcher backs off longer for these.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<ClientError> for hermes_types::HermesError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Timeout => Self::UpstreamTimeout,
            other => Self::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(ClientError::Timeout.is_transport());
        assert!(ClientError::Connection("refused".into()).is_transport());
        assert!(!ClientError::HtmlResponse.is_transport());
        assert!(!ClientError::Rejected("nope".into()).is_transport());
        assert!(!ClientError::Status {
            status: 500,
            body: String::new()
        }
        .is_transport());
    }

    #[test]
    fn test_hermes_error_mapping() {
        let err: hermes_types::HermesError = ClientError::Timeout.into();
        assert_eq!(err.status_code(), 502);

        let err: hermes_types::HermesError = ClientError::HtmlResponse.into();
        assert_eq!(err.status_code(), 502);
    }
}
