//! Typed webhook event processing
//!
//! Runs after the raw envelope is persisted. Each event type fans out
//! into its domain tables; a failure leaves only that envelope
//! unprocessed. Session-state events always apply; chat-data events are
//! gated by the session's `chat_log_enabled` flag.

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use hermes_db::repo::{
    ChatRepository, CreateChatMessage, CreateHistorySync, CreateMessageStatus, CreatePresence,
    CreateReadReceipt, CreateWaMessage, SessionEventUpdate, SessionRepository, UpsertChatPresence,
    UpsertChatRoom,
};
use hermes_types::{DeliveryStatus, HermesResult};

use crate::state::AppState;
use crate::webhook::events::{self, WebhookEnvelope};

/// Composing states auto-expire after this long without a follow-up
const TYPING_EXPIRY: Duration = Duration::seconds(10);

/// QR codes are valid for one minute
const QR_EXPIRY: Duration = Duration::seconds(60);

/// Route one envelope into the domain tables.
pub async fn process_event(state: &AppState, envelope: &WebhookEnvelope) -> HermesResult<()> {
    match envelope.event_type.as_str() {
        // Session-state events bypass the chat-log gate
        "Connected" => return process_connected(state, envelope).await,
        "QR" => return process_qr(state, envelope).await,
        "Disconnected" => return process_disconnected(state, envelope).await,
        _ => {}
    }

    let session = state
        .repos
        .sessions
        .find_by_token(&envelope.token)
        .await?;

    let chat_log_enabled = session.as_ref().map(|s| s.chat_log_enabled).unwrap_or(false);
    if !chat_log_enabled {
        tracing::debug!(
            event_type = %envelope.event_type,
            "chat log disabled, acknowledging without persistence"
        );
        return Ok(());
    }

    let session_jid = session.and_then(|s| s.jid);

    match envelope.event_type.as_str() {
        "Message" => process_message(state, envelope, session_jid, false).await,
        "MessageSent" => process_message(state, envelope, session_jid, true).await,
        "ReadReceipt" => process_read_receipt(state, envelope, session_jid).await,
        "Presence" => process_presence(state, envelope).await,
        "ChatPresence" => process_chat_presence(state, envelope).await,
        "HistorySync" => process_history_sync(state, envelope).await,
        other => {
            tracing::warn!(event_type = %other, "unknown webhook event type");
            Ok(())
        }
    }
}

async fn process_connected(state: &AppState, envelope: &WebhookEnvelope) -> HermesResult<()> {
    let now = Utc::now();
    state
        .repos
        .sessions
        .apply_session_event(
            &envelope.token,
            SessionEventUpdate {
                status: "connected".to_string(),
                connected: true,
                logged_in: true,
                qr_code: Some(String::new()),
                qr_expired_at: None,
                connected_at: Some(now),
                disconnected_at: None,
            },
        )
        .await?;
    Ok(())
}

async fn process_qr(state: &AppState, envelope: &WebhookEnvelope) -> HermesResult<()> {
    let data = &envelope.event;
    let qr_code = events::get_str(data, "qrCodeBase64")
        .or_else(|| events::get_str(data, "event"))
        .unwrap_or_default()
        .to_string();

    let now = Utc::now();
    state
        .repos
        .sessions
        .apply_session_event(
            &envelope.token,
            SessionEventUpdate {
                status: "qr_waiting".to_string(),
                connected: false,
                logged_in: false,
                qr_code: Some(qr_code),
                qr_expired_at: Some(now + QR_EXPIRY),
                connected_at: None,
                disconnected_at: None,
            },
        )
        .await?;
    Ok(())
}

async fn process_disconnected(state: &AppState, envelope: &WebhookEnvelope) -> HermesResult<()> {
    let now = Utc::now();
    state
        .repos
        .sessions
        .apply_session_event(
            &envelope.token,
            SessionEventUpdate {
                status: "disconnected".to_string(),
                connected: false,
                logged_in: false,
                qr_code: None,
                qr_expired_at: None,
                connected_at: None,
                disconnected_at: Some(now),
            },
        )
        .await?;
    Ok(())
}

/// Persist a message event and mirror it into the chat tables.
///
/// `from_me` distinguishes `MessageSent` (the session owner is the
/// sender) from `Message` (an external sender; the session JID is the
/// recipient).
async fn process_message(
    state: &AppState,
    envelope: &WebhookEnvelope,
    session_jid: Option<String>,
    from_me: bool,
) -> HermesResult<()> {
    let data = &envelope.event;
    let info = events::info_section(data);
    let message = events::message_section(data);

    let Some(message_id) = events::message_id(data) else {
        tracing::warn!("message event without an id, skipping");
        return Ok(());
    };

    let message_type = events::message_type(data);
    if events::is_filtered(&message_type, message) {
        tracing::debug!(message_id = %message_id, "message filtered");
        return Ok(());
    }

    let now = Utc::now();
    let timestamp = events::event_timestamp(data, now);
    let chat = events::get_str(info, "Chat")
        .or_else(|| events::get_str(data, "to"))
        .unwrap_or_default()
        .to_string();

    let (from_jid, to_jid, push_name) = if from_me {
        let from = session_jid
            .clone()
            .unwrap_or_else(|| format!("{}@s.whatsapp.net", envelope.token));
        (from, chat.clone(), None)
    } else {
        let from = events::get_str(info, "Sender")
            .or_else(|| events::get_str(data, "from"))
            .map(events::clean_jid)
            .unwrap_or_default();
        let to = session_jid.clone().unwrap_or(chat.clone());
        let push_name = events::get_str(info, "PushName")
            .or_else(|| events::get_str(data, "pushname"))
            .map(ToString::to_string);
        (from, to, push_name)
    };

    let is_group = events::get_bool(info, "IsGroup");
    let body = events::text_body(message);
    let caption = events::get_str(message, "caption").map(ToString::to_string);
    let media = events::media_data(message);
    let quoted = events::quoted_data(message);

    let inserted = state
        .repos
        .chat
        .insert_message(CreateWaMessage {
            message_id: message_id.clone(),
            from_jid: from_jid.clone(),
            to_jid: to_jid.clone(),
            from_me,
            push_name: push_name.clone(),
            message_type: message_type.clone(),
            body: body.clone(),
            caption: caption.clone(),
            media: media.clone(),
            quoted,
            group_jid: is_group.then(|| chat.clone()),
            participant: events::get_str(info, "Participant").map(ToString::to_string),
            status: if from_me { "sent" } else { "received" }.to_string(),
            message_timestamp: timestamp,
            user_token: envelope.token.clone(),
        })
        .await?;

    if !inserted {
        tracing::debug!(message_id = %message_id, "duplicate message dropped");
        return Ok(());
    }

    metrics::counter!("webhook_messages_total", "direction" => if from_me { "out" } else { "in" })
        .increment(1);

    // Chat room bookkeeping
    let (contact_jid, sender_jid, sender_type) = if from_me {
        (to_jid.clone(), from_jid.clone(), "user")
    } else {
        (from_jid.clone(), from_jid.clone(), "contact")
    };

    if contact_jid.is_empty() {
        return Ok(());
    }

    let chat_id = format!("{}_{}", envelope.token, contact_jid);
    let content = body.unwrap_or_default();

    state
        .repos
        .chat
        .upsert_chat_room(UpsertChatRoom {
            chat_id: chat_id.clone(),
            user_token: envelope.token.clone(),
            contact_jid,
            contact_name: push_name,
            is_group,
            last_message: events::preview(&content, &message_type),
            last_sender: sender_type.to_string(),
            last_activity: timestamp,
        })
        .await?;

    state
        .repos
        .chat
        .insert_chat_message(CreateChatMessage {
            message_id,
            chat_id,
            user_token: envelope.token.clone(),
            sender_jid,
            sender_type: sender_type.to_string(),
            message_type,
            content: Some(content),
            caption,
            media,
            quoted_message_id: None,
            // Incoming messages have by definition been delivered to us
            status: if from_me { "sent" } else { "delivered" }.to_string(),
            message_timestamp: timestamp,
        })
        .await?;

    Ok(())
}

/// Persist a receipt, dedup it, and advance message statuses under the
/// strict progression rule.
async fn process_read_receipt(
    state: &AppState,
    envelope: &WebhookEnvelope,
    session_jid: Option<String>,
) -> HermesResult<()> {
    let data = &envelope.event;
    let now = Utc::now();

    let receipt_type = events::receipt_type(data);
    let message_ids = events::receipt_message_ids(data);
    let message_ids_json = json!({ "ids": message_ids });

    if state
        .repos
        .chat
        .receipt_exists(&message_ids_json, &receipt_type, &envelope.token)
        .await?
    {
        tracing::debug!(receipt_type = %receipt_type, "duplicate read receipt ignored");
        return Ok(());
    }

    let sender = events::event_sender(data).unwrap_or_default();
    let chat = events::event_chat(data).unwrap_or_default();
    let owner = session_jid.unwrap_or_default();

    // Who read whose message decides the direction
    let (from_jid, to_jid) = if sender == owner {
        // The session owner read a message sent to them
        (chat.clone(), sender.clone())
    } else {
        // An external party read the owner's message
        (owner.clone(), sender.clone())
    };

    state
        .repos
        .chat
        .insert_receipt(CreateReadReceipt {
            message_ids: message_ids_json,
            from_jid,
            to_jid,
            receipt_type: receipt_type.clone(),
            event_timestamp: events::event_timestamp(data, now),
            user_token: envelope.token.clone(),
        })
        .await?;

    let timestamp = events::event_timestamp(data, now);
    for message_id in &message_ids {
        advance_message_status(state, message_id, &receipt_type, &envelope.token, timestamp)
            .await?;
    }

    Ok(())
}

/// Record a status row (deduped) and advance the message iff the new
/// status outranks the stored one. `sent → delivered → read`, never back.
async fn advance_message_status(
    state: &AppState,
    message_id: &str,
    status: &str,
    user_token: &str,
    timestamp: chrono::DateTime<Utc>,
) -> HermesResult<()> {
    if state
        .repos
        .chat
        .status_exists(message_id, status, user_token)
        .await?
    {
        tracing::debug!(message_id, status, "duplicate message status ignored");
        return Ok(());
    }

    state
        .repos
        .chat
        .insert_status(CreateMessageStatus {
            message_id: message_id.to_string(),
            status: status.to_string(),
            event_timestamp: timestamp,
            user_token: user_token.to_string(),
        })
        .await?;

    let Some(new_status) = DeliveryStatus::parse(status) else {
        // Non-progression states (e.g. "played") are recorded but never
        // move the message
        return Ok(());
    };

    let current = state
        .repos
        .chat
        .message_status(message_id, user_token)
        .await?;

    let current_priority = current
        .as_deref()
        .and_then(DeliveryStatus::parse)
        .map(|s| s.priority())
        .unwrap_or(0);

    if new_status.priority() > current_priority {
        state
            .repos
            .chat
            .set_message_status(message_id, user_token, new_status.as_str())
            .await?;
        state
            .repos
            .chat
            .advance_chat_message(message_id, new_status.as_str(), timestamp)
            .await?;
    }

    Ok(())
}

async fn process_presence(state: &AppState, envelope: &WebhookEnvelope) -> HermesResult<()> {
    let data = &envelope.event;

    let from_jid = events::event_sender(data).unwrap_or_default();
    let presence = events::get_str(data, "State")
        .or_else(|| events::get_str(data, "presence"))
        .unwrap_or("unavailable")
        .to_string();

    let last_seen = events::get_str(data, "LastSeen")
        .or_else(|| events::get_str(data, "lastSeen"))
        .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    state
        .repos
        .chat
        .insert_presence(CreatePresence {
            from_jid,
            presence,
            last_seen,
            user_token: envelope.token.clone(),
        })
        .await?;

    Ok(())
}

/// Upsert the latest typing state; `composing` arms a one-shot expiry
/// timer keyed by the exact `expires_at` it wrote.
async fn process_chat_presence(state: &AppState, envelope: &WebhookEnvelope) -> HermesResult<()> {
    let data = &envelope.event;
    let event = events::event_section(data);

    let from_jid = events::event_sender(data).unwrap_or_default();
    let chat_jid = events::event_chat(data).unwrap_or_default();
    let presence_state = events::get_str(event, "State")
        .or_else(|| events::get_str(data, "state"))
        .unwrap_or("paused")
        .to_string();
    let media = events::get_str(event, "Media")
        .or_else(|| events::get_str(data, "media"))
        .map(ToString::to_string);

    let expires_at = (presence_state == "composing").then(|| Utc::now() + TYPING_EXPIRY);

    state
        .repos
        .chat
        .upsert_chat_presence(UpsertChatPresence {
            from_jid: from_jid.clone(),
            chat_jid: chat_jid.clone(),
            state: presence_state.clone(),
            media,
            expires_at,
            user_token: envelope.token.clone(),
        })
        .await?;

    if let Some(expires_at) = expires_at {
        let repos = state.repos.clone();
        let token = envelope.token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(TYPING_EXPIRY.to_std().unwrap_or_default()).await;

            // A newer composing event rewrites expires_at, turning this
            // wake-up into a no-op
            match repos
                .chat
                .expire_chat_presence(&from_jid, &chat_jid, &token, expires_at)
                .await
            {
                Ok(0) => {}
                Ok(_) => {
                    tracing::debug!(from = %from_jid, chat = %chat_jid, "auto-stopped typing");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "typing auto-expiry failed");
                }
            }
        });
    }

    Ok(())
}

async fn process_history_sync(state: &AppState, envelope: &WebhookEnvelope) -> HermesResult<()> {
    let data = &envelope.event;

    let sync_type = events::get_str(data, "syncType").unwrap_or("unknown").to_string();
    let conversations = data
        .get("conversations")
        .cloned()
        .map(|c| json!({ "conversations": c }))
        .unwrap_or_else(|| json!({ "conversations": Value::Null }));

    state
        .repos
        .chat
        .insert_history_sync(CreateHistorySync {
            sync_type,
            conversations,
            user_token: envelope.token.clone(),
        })
        .await?;

    Ok(())
}
