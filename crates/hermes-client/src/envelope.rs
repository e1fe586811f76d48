//! Upstream response envelope parsing

use serde::Deserialize;

use crate::error::ClientError;

/// The upstream `{code, success, message, data}` envelope for sends
#[derive(Debug, Clone, Deserialize)]
pub struct SendEnvelope {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<SendData>,
}

/// Payload of a successful send
#[derive(Debug, Clone, Deserialize)]
pub struct SendData {
    /// Upstream message ID (the field is literally "Id")
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Details", default)]
    pub details: String,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: i64,
}

/// Outcome of a successful message send
#[derive(Debug, Clone)]
pub struct SendSuccess {
    pub message_id: String,
}

/// Session fields parsed from `/session/**` response bodies
#[derive(Debug, Clone, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub jid: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub connected: bool,
    #[serde(rename = "loggedIn", default)]
    pub logged_in: bool,
}

fn looks_like_html(body: &str) -> bool {
    body.contains("<html>") || body.contains("<!DOCTYPE")
}

/// Interpret a message-send response.
///
/// Success requires a 200 status AND `success = true` in the envelope.
/// HTML bodies are reported as a distinct error class.
pub fn parse_send_response(status: u16, body: &[u8]) -> Result<SendSuccess, ClientError> {
    let body_str = String::from_utf8_lossy(body);

    if status != 200 {
        return Err(ClientError::Status {
            status,
            body: body_str.into_owned(),
        });
    }

    let envelope: SendEnvelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            if looks_like_html(&body_str) {
                return Err(ClientError::HtmlResponse);
            }
            return Err(ClientError::Parse {
                detail: err.to_string(),
                body: body_str.into_owned(),
            });
        }
    };

    if !envelope.success {
        return Err(ClientError::Rejected(envelope.message));
    }

    let message_id = envelope.data.map(|d| d.id).unwrap_or_default();
    Ok(SendSuccess { message_id })
}

/// Extract session fields from a `/session/**` response body.
///
/// The payload may sit under `data` or at the top level; the session id
/// may be named `id` or `sessionId`. Returns `None` when no id is found.
pub fn parse_session_body(body: &[u8]) -> Option<SessionData> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let payload = value.get("data").filter(|d| d.is_object()).unwrap_or(&value);

    let mut session: SessionData = serde_json::from_value(payload.clone()).ok()?;
    if session.id.is_empty() {
        if let Some(alt) = payload.get("sessionId").and_then(|v| v.as_str()) {
            session.id = alt.to_string();
        }
    }

    if session.id.is_empty() {
        return None;
    }
    Some(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_send() {
        let body = br#"{"code":200,"success":true,"message":"ok","data":{"Id":"ABC","Details":"Sent","Timestamp":1700000000}}"#;
        let outcome = parse_send_response(200, body).unwrap();
        assert_eq!(outcome.message_id, "ABC");
    }

    #[test]
    fn test_non_200_is_status_error() {
        let body = br#"{"code":500,"success":false}"#;
        let err = parse_send_response(500, body).unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 500, .. }));
    }

    #[test]
    fn test_envelope_rejection() {
        let body = br#"{"code":200,"success":false,"message":"number not on whatsapp"}"#;
        let err = parse_send_response(200, body).unwrap_err();
        match err {
            ClientError::Rejected(message) => assert_eq!(message, "number not on whatsapp"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_html_body_detected() {
        let body = b"<!DOCTYPE html><html><body>502</body></html>";
        let err = parse_send_response(200, body).unwrap_err();
        assert!(matches!(err, ClientError::HtmlResponse));
    }

    #[test]
    fn test_garbage_body_is_parse_error() {
        let body = b"}}}not json";
        let err = parse_send_response(200, body).unwrap_err();
        assert!(matches!(err, ClientError::Parse { .. }));
    }

    #[test]
    fn test_session_body_under_data() {
        let body = br#"{"code":200,"success":true,"data":{"id":"s1","name":"main","token":"wat_x","jid":"628@s.whatsapp.net","status":"connected","connected":true,"loggedIn":true}}"#;
        let session = parse_session_body(body).unwrap();
        assert_eq!(session.id, "s1");
        assert!(session.connected);
        assert!(session.logged_in);
    }

    #[test]
    fn test_session_body_top_level_with_alt_id() {
        let body = br#"{"sessionId":"s2","connected":false}"#;
        let session = parse_session_body(body).unwrap();
        assert_eq!(session.id, "s2");
        assert!(!session.connected);
    }

    #[test]
    fn test_session_body_without_id_is_none() {
        let body = br#"{"connected":true}"#;
        assert!(parse_session_body(body).is_none());
    }

    #[test]
    fn test_session_body_garbage_is_none() {
        assert!(parse_session_body(b"<html>").is_none());
    }
}
