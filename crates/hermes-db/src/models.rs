//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.
//! Status columns are stored as strings; use the accessor methods to get
//! the typed enum (unknown values decode to `Unknown`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use hermes_types::{
    BulkCampaignStatus, BulkItemStatus, CampaignStatus, CampaignType, SubscriptionStatus,
};

/// Service user row (`service_users`)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ServiceUserRow {
    pub user_id: String,
    pub source_service: String,
    #[serde(skip_serializing)]
    pub api_key_hash: String,
    pub status: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceUserRow {
    /// Whether the user may authenticate
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// Subscription row (`subscriptions`)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubscriptionRow {
    pub id: i64,
    pub user_id: String,
    pub provider: String,
    pub max_sessions: i32,
    pub max_messages: i64,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    /// Typed status accessor
    pub fn subscription_status(&self) -> SubscriptionStatus {
        SubscriptionStatus::parse(&self.status)
    }

    /// Whether `now` has passed the expiry date
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Session row (`sessions`)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionRow {
    pub id: i64,
    pub user_id: String,
    pub provider: String,
    pub session_id: String,
    pub session_name: Option<String>,
    #[serde(skip_serializing)]
    pub session_token: String,
    pub webhook_url: Option<String>,
    pub jid: Option<String>,
    pub connected: bool,
    pub logged_in: bool,
    pub status: String,
    pub auto_read_enabled: bool,
    pub typing_enabled: bool,
    pub chat_log_enabled: bool,
    pub qr_code: Option<String>,
    pub qr_expired_at: Option<DateTime<Utc>>,
    pub connected_at: Option<DateTime<Utc>>,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub last_message_sent: i64,
    pub last_message_fail: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-type message statistics row (`message_stats`)
///
/// Unique on `(user_id, session_id, message_type)`; always written with
/// insert-or-increment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageStatRow {
    pub id: i64,
    pub user_id: String,
    pub session_id: String,
    pub message_type: String,
    pub total_sent: i64,
    pub total_failed: i64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact row (`contacts`), unique on `(user_id, session_id, jid)`
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContactRow {
    pub id: i64,
    pub user_id: String,
    pub session_id: String,
    pub jid: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub raw: serde_json::Value,
    pub last_synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Campaign template row (`campaigns`)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CampaignRow {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub campaign_type: String,
    pub status: String,
    pub message_body: Option<String>,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignRow {
    pub fn kind(&self) -> CampaignType {
        CampaignType::parse(&self.campaign_type)
    }

    pub fn campaign_status(&self) -> CampaignStatus {
        CampaignStatus::parse(&self.status)
    }
}

/// Bulk campaign execution row (`bulk_campaigns`)
///
/// Carries a snapshot of the template content taken at creation time, so
/// editing or deleting the template never affects a queued run.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BulkCampaignRow {
    pub id: i64,
    pub user_id: String,
    pub campaign_id: Option<i64>,
    pub name: String,
    pub campaign_type: String,
    pub message_body: Option<String>,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
    pub caption: Option<String>,
    pub status: String,
    pub total_count: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BulkCampaignRow {
    pub fn kind(&self) -> CampaignType {
        CampaignType::parse(&self.campaign_type)
    }

    pub fn bulk_status(&self) -> BulkCampaignStatus {
        BulkCampaignStatus::parse(&self.status)
    }
}

/// Per-recipient item row (`bulk_campaign_items`)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BulkItemRow {
    pub id: i64,
    pub bulk_campaign_id: i64,
    pub phone: String,
    pub status: String,
    pub message_id: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BulkItemRow {
    pub fn item_status(&self) -> BulkItemStatus {
        BulkItemStatus::parse(&self.status)
    }
}

/// Raw webhook envelope row (`webhook_events`), append-only
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookEventRow {
    pub id: i64,
    pub event_type: String,
    pub source: String,
    pub user_token: String,
    pub event_data: serde_json::Value,
    pub raw_data: String,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
}

/// Processed WhatsApp message row (`wa_messages`)
///
/// `message_id` is unique per `user_token`; duplicate intake is a no-op.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WaMessageRow {
    pub id: i64,
    pub message_id: String,
    pub from_jid: String,
    pub to_jid: String,
    pub from_me: bool,
    pub push_name: Option<String>,
    pub message_type: String,
    pub body: Option<String>,
    pub caption: Option<String>,
    pub media: Option<serde_json::Value>,
    pub quoted: Option<serde_json::Value>,
    pub group_jid: Option<String>,
    pub participant: Option<String>,
    pub status: String,
    pub message_timestamp: DateTime<Utc>,
    pub user_token: String,
    pub created_at: DateTime<Utc>,
}

/// Read receipt row (`read_receipts`)
///
/// Dedup key: `(message_ids, receipt_type, user_token)`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReadReceiptRow {
    pub id: i64,
    pub message_ids: serde_json::Value,
    pub from_jid: String,
    pub to_jid: String,
    pub receipt_type: String,
    pub event_timestamp: DateTime<Utc>,
    pub user_token: String,
    pub received_at: DateTime<Utc>,
}

/// Message status row (`message_statuses`)
///
/// Dedup key: `(message_id, status, user_token)`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageStatusRow {
    pub id: i64,
    pub message_id: String,
    pub status: String,
    pub event_timestamp: DateTime<Utc>,
    pub user_token: String,
    pub received_at: DateTime<Utc>,
}

/// Presence row (`presences`)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PresenceRow {
    pub id: i64,
    pub from_jid: String,
    pub presence: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub user_token: String,
    pub received_at: DateTime<Utc>,
}

/// Chat presence (typing) row (`chat_presences`)
///
/// One row per `(from_jid, chat_jid, user_token)` holding the latest
/// state; `expires_at` arms the composing auto-expiry timer.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatPresenceRow {
    pub id: i64,
    pub from_jid: String,
    pub chat_jid: String,
    pub state: String,
    pub media: Option<String>,
    pub auto_stopped: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_token: String,
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// History sync row (`history_syncs`)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HistorySyncRow {
    pub id: i64,
    pub sync_type: String,
    pub conversations: serde_json::Value,
    pub user_token: String,
    pub received_at: DateTime<Utc>,
}

/// Chat room row (`chat_rooms`)
///
/// `chat_id` is `<user_token>_<contact_jid>` and unique.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatRoomRow {
    pub id: i64,
    pub chat_id: String,
    pub user_token: String,
    pub contact_jid: String,
    pub contact_name: Option<String>,
    pub chat_type: String,
    pub is_group: bool,
    pub group_name: Option<String>,
    pub last_message: Option<String>,
    pub last_sender: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub unread_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chat message row (`chat_messages`), unique on `message_id`
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatMessageRow {
    pub id: i64,
    pub message_id: String,
    pub chat_id: String,
    pub user_token: String,
    pub sender_jid: String,
    pub sender_type: String,
    pub message_type: String,
    pub content: Option<String>,
    pub caption: Option<String>,
    pub media: Option<serde_json::Value>,
    pub quoted_message_id: Option<String>,
    pub status: String,
    pub message_timestamp: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
