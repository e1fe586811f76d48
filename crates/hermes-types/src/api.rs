//! API request/response envelopes
//!
//! The bulk/campaign surface and the upstream WhatsApp service both speak
//! the `{code, success, message, data}` envelope; the gateway error path
//! uses the smaller `{status, message}` shape.

use serde::{Deserialize, Serialize};

/// Standard `{code, success, message, data}` response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// HTTP-ish status code mirrored into the body
    pub code: u16,
    /// Whether the request succeeded
    pub success: bool,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response payload (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Successful response with payload
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Successful response with payload and message
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            code: 200,
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// Created (201) response with payload and message
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            code: 201,
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// Failed response with no payload
    pub fn failure(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Error body returned by the `/wa` gateway on admission/proxy failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayErrorBody {
    /// HTTP status mirrored into the body
    pub status: u16,
    /// Human-readable message
    pub message: String,
}

impl GatewayErrorBody {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_ok_shape() {
        let env = Envelope::ok(serde_json::json!({"id": 1}));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["code"], 200);
        assert_eq!(json["success"], true);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_envelope_failure_has_no_data() {
        let env: Envelope<serde_json::Value> = Envelope::failure(404, "campaign not found");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
    }
}
