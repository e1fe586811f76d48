//! Webhook event payload extraction
//!
//! Upstream events arrive in two generations of field naming: the current
//! shape nests metadata under `Info`/`Message`/`event`, the legacy shape
//! is flat. Every accessor tries the current name first and falls back.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Inbound envelope: `{type, token, event}`
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub token: String,
    #[serde(default)]
    pub event: Value,
}

/// Normalize a JID: drop the device suffix (`:24`) and ensure the
/// `@s.whatsapp.net` domain.
pub fn clean_jid(jid: &str) -> String {
    let base = jid.split(':').next().unwrap_or(jid);
    if base.contains('@') {
        base.to_string()
    } else {
        let without_domain = base.split('@').next().unwrap_or(base);
        format!("{without_domain}@s.whatsapp.net")
    }
}

/// `Info` section of a message event (or the event itself, legacy shape)
pub fn info_section(data: &Value) -> &Value {
    data.get("Info").filter(|v| v.is_object()).unwrap_or(data)
}

/// `Message` section of a message event (or the event itself)
pub fn message_section(data: &Value) -> &Value {
    data.get("Message").filter(|v| v.is_object()).unwrap_or(data)
}

/// `event` section of receipt/presence events (or the event itself)
pub fn event_section(data: &Value) -> &Value {
    data.get("event").filter(|v| v.is_object()).unwrap_or(data)
}

pub fn get_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

pub fn get_bool(value: &Value, key: &str) -> bool {
    value.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Message ID: `Info.ID`, then `MessageID`, then `id`
pub fn message_id(data: &Value) -> Option<String> {
    let info = info_section(data);
    get_str(info, "ID")
        .or_else(|| get_str(data, "MessageID"))
        .or_else(|| get_str(data, "id"))
        .map(ToString::to_string)
}

/// Event timestamp: RFC3339 string or Unix seconds, falling back to `now`
pub fn event_timestamp(data: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    let info = info_section(data);

    for source in [info, data] {
        if let Some(raw) = get_str(source, "Timestamp").or_else(|| get_str(source, "timestamp")) {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return parsed.with_timezone(&Utc);
            }
        }
        if let Some(unix) = source
            .get("Timestamp")
            .or_else(|| source.get("timestamp"))
            .and_then(|v| v.as_f64())
        {
            if let Some(parsed) = Utc.timestamp_opt(unix as i64, 0).single() {
                return parsed;
            }
        }
    }

    now
}

/// Message type: `Info.Type`/`Info.MessageType`, then `type`
pub fn message_type(data: &Value) -> String {
    let info = info_section(data);
    get_str(info, "Type")
        .or_else(|| get_str(info, "MessageType"))
        .or_else(|| get_str(data, "type"))
        .unwrap_or("unknown")
        .to_string()
}

/// Text body: `conversation`, `extendedTextMessage.text`, or `body`
pub fn text_body(message: &Value) -> Option<String> {
    if let Some(conversation) = get_str(message, "conversation") {
        return Some(conversation.to_string());
    }
    if let Some(text) = message
        .get("extendedTextMessage")
        .and_then(|v| v.get("text"))
        .and_then(|v| v.as_str())
    {
        return Some(text.to_string());
    }
    get_str(message, "body").map(ToString::to_string)
}

/// Drop `text` messages whose body is empty after trimming
pub fn is_filtered(message_type: &str, message: &Value) -> bool {
    if message_type != "text" {
        return false;
    }

    match text_body(message) {
        Some(body) => body.trim().is_empty(),
        None => true,
    }
}

/// Media payload: `media` or the per-type `*Message` object
pub fn media_data(message: &Value) -> Option<Value> {
    const KEYS: &[&str] = &[
        "media",
        "imageMessage",
        "videoMessage",
        "audioMessage",
        "documentMessage",
        "stickerMessage",
        "locationMessage",
        "location",
        "contactMessage",
        "contact",
    ];

    KEYS.iter()
        .find_map(|key| message.get(*key).filter(|v| v.is_object()).cloned())
}

/// Quoted message / context info
pub fn quoted_data(message: &Value) -> Option<Value> {
    if let Some(quoted) = message.get("quotedMessage").filter(|v| v.is_object()) {
        return Some(quoted.clone());
    }
    message
        .get("extendedTextMessage")
        .and_then(|v| v.get("contextInfo"))
        .filter(|v| v.is_object())
        .cloned()
}

/// Receipt message IDs: `event.MessageIDs` or `messageIds`
pub fn receipt_message_ids(data: &Value) -> Vec<String> {
    let event = event_section(data);

    let list = event
        .get("MessageIDs")
        .or_else(|| data.get("messageIds"))
        .and_then(|v| v.as_array());

    list.map(|ids| {
        ids.iter()
            .filter_map(|v| v.as_str())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Receipt type: `state`, falling back to `event.Type`, lowercased.
///
/// When both fields are absent this is empty, which is not a
/// progression value and therefore never advances a message.
pub fn receipt_type(data: &Value) -> String {
    let event = event_section(data);
    get_str(data, "state")
        .or_else(|| get_str(event, "Type"))
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Sender JID of a receipt/presence event
pub fn event_sender(data: &Value) -> Option<String> {
    let event = event_section(data);
    get_str(event, "Sender")
        .or_else(|| get_str(data, "Sender"))
        .or_else(|| get_str(data, "from"))
        .map(clean_jid)
}

/// Chat JID of a receipt/chat-presence event
pub fn event_chat(data: &Value) -> Option<String> {
    let event = event_section(data);
    get_str(event, "Chat")
        .or_else(|| get_str(data, "chatJid"))
        .or_else(|| get_str(data, "to"))
        .map(ToString::to_string)
}

/// Shorten a message body for the chat room preview
pub fn preview(content: &str, message_type: &str) -> String {
    if content.is_empty() {
        return format!("[{message_type}]");
    }
    if content.chars().count() > 100 {
        let truncated: String = content.chars().take(100).collect();
        format!("{truncated}...")
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_jid() {
        assert_eq!(clean_jid("628111:24@s.whatsapp.net"), "628111@s.whatsapp.net");
        assert_eq!(clean_jid("628111@s.whatsapp.net"), "628111@s.whatsapp.net");
        assert_eq!(clean_jid("628111"), "628111@s.whatsapp.net");
        assert_eq!(clean_jid("628111:7"), "628111@s.whatsapp.net");
    }

    #[test]
    fn test_message_id_fallbacks() {
        assert_eq!(
            message_id(&json!({"Info": {"ID": "A1"}})).unwrap(),
            "A1"
        );
        assert_eq!(message_id(&json!({"MessageID": "B2"})).unwrap(), "B2");
        assert_eq!(message_id(&json!({"id": "C3"})).unwrap(), "C3");
        assert!(message_id(&json!({})).is_none());
    }

    #[test]
    fn test_timestamp_rfc3339() {
        let now = Utc::now();
        let ts = event_timestamp(
            &json!({"Info": {"Timestamp": "2025-03-01T10:00:00Z"}}),
            now,
        );
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_timestamp_unix() {
        let now = Utc::now();
        let ts = event_timestamp(&json!({"timestamp": 1700000000.0}), now);
        assert_eq!(ts.timestamp(), 1700000000);
    }

    #[test]
    fn test_timestamp_fallback_is_now() {
        let now = Utc::now();
        assert_eq!(event_timestamp(&json!({}), now), now);
    }

    #[test]
    fn test_text_body_variants() {
        assert_eq!(
            text_body(&json!({"conversation": "hi"})).unwrap(),
            "hi"
        );
        assert_eq!(
            text_body(&json!({"extendedTextMessage": {"text": "yo"}})).unwrap(),
            "yo"
        );
        assert_eq!(text_body(&json!({"body": "hey"})).unwrap(), "hey");
        assert!(text_body(&json!({})).is_none());
    }

    #[test]
    fn test_empty_text_filtered() {
        assert!(is_filtered("text", &json!({"conversation": "   "})));
        assert!(is_filtered("text", &json!({})));
        assert!(!is_filtered("text", &json!({"conversation": "hello"})));
        assert!(!is_filtered("image", &json!({})));
    }

    #[test]
    fn test_receipt_ids() {
        let data = json!({"event": {"MessageIDs": ["A", "B"]}});
        assert_eq!(receipt_message_ids(&data), vec!["A", "B"]);

        let legacy = json!({"messageIds": ["C"]});
        assert_eq!(receipt_message_ids(&legacy), vec!["C"]);

        assert!(receipt_message_ids(&json!({})).is_empty());
    }

    #[test]
    fn test_receipt_type_lowercased() {
        assert_eq!(receipt_type(&json!({"state": "Read"})), "read");
        assert_eq!(receipt_type(&json!({"event": {"Type": "delivered"}})), "delivered");
        // Missing fields yield an empty, non-progression type
        assert_eq!(receipt_type(&json!({})), "");
    }

    #[test]
    fn test_preview_truncation() {
        assert_eq!(preview("short", "text"), "short");
        assert_eq!(preview("", "image"), "[image]");

        let long = "x".repeat(150);
        let shortened = preview(&long, "text");
        assert_eq!(shortened.chars().count(), 103);
        assert!(shortened.ends_with("..."));
    }

    #[test]
    fn test_media_extraction() {
        let message = json!({"imageMessage": {"url": "https://cdn/x"}});
        assert!(media_data(&message).is_some());
        assert!(media_data(&json!({"conversation": "hi"})).is_none());
    }
}
