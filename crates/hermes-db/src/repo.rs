//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbResult;
use crate::models::*;

/// Service user repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, user_id: &str) -> DbResult<Option<ServiceUserRow>>;

    /// Find a user by the SHA-256 hash of their API key
    async fn find_by_api_key_hash(&self, hash: &str) -> DbResult<Option<ServiceUserRow>>;

    /// List users, optionally filtered by source service
    async fn list(&self, source: Option<&str>, limit: i64, offset: i64)
        -> DbResult<Vec<ServiceUserRow>>;

    /// Count users, optionally filtered by source service
    async fn count(&self, source: Option<&str>) -> DbResult<i64>;

    /// Create a new user
    async fn create(&self, user: CreateServiceUser) -> DbResult<ServiceUserRow>;

    /// Update a user's source service
    async fn update_source(&self, user_id: &str, source: &str) -> DbResult<()>;

    /// Replace the stored API key hash (rotation)
    async fn update_api_key_hash(&self, user_id: &str, hash: &str) -> DbResult<()>;

    /// Check source ownership for scoped internal keys
    async fn belongs_to_source(&self, user_id: &str, source: &str) -> DbResult<bool>;
}

/// Create service user input
#[derive(Debug, Clone)]
pub struct CreateServiceUser {
    pub user_id: String,
    pub source_service: String,
    pub api_key_hash: String,
    pub created_by: Option<String>,
}

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find the active subscription for `(user, provider)`
    async fn find_active(&self, user_id: &str, provider: &str)
        -> DbResult<Option<SubscriptionRow>>;

    /// Find the most recently updated subscription regardless of status
    async fn find_latest(&self, user_id: &str, provider: &str)
        -> DbResult<Option<SubscriptionRow>>;

    /// Create or refresh the `(user, provider)` subscription, reactivating it
    async fn upsert(&self, sub: UpsertSubscription) -> DbResult<SubscriptionRow>;

    /// Flip a single subscription to `expired`
    async fn mark_expired(&self, id: i64) -> DbResult<()>;

    /// Flip every active subscription past its expiry; returns rows affected
    async fn expire_due(&self, now: DateTime<Utc>) -> DbResult<u64>;
}

/// Upsert subscription input
#[derive(Debug, Clone)]
pub struct UpsertSubscription {
    pub user_id: String,
    pub provider: String,
    pub max_sessions: i32,
    pub max_messages: i64,
    pub expires_at: DateTime<Utc>,
}

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Find a session by its secret token
    async fn find_by_token(&self, token: &str) -> DbResult<Option<SessionRow>>;

    /// Find a session by owner and upstream session id
    async fn find_by_session_id(&self, user_id: &str, session_id: &str)
        -> DbResult<Option<SessionRow>>;

    /// All sessions owned by a user, most recently updated first
    async fn find_by_user(&self, user_id: &str) -> DbResult<Vec<SessionRow>>;

    /// Most recently updated connected session for a user
    async fn latest_connected(&self, user_id: &str) -> DbResult<Option<SessionRow>>;

    /// Count sessions with `connected = true` for a user
    async fn count_connected(&self, user_id: &str) -> DbResult<i64>;

    /// Count sessions in an admission-relevant status for a user
    async fn count_active(&self, user_id: &str) -> DbResult<i64>;

    /// Create a new session
    async fn create(&self, session: CreateSession) -> DbResult<SessionRow>;

    /// Patch local session settings
    async fn update_settings(
        &self,
        user_id: &str,
        session_id: &str,
        update: SessionSettingsUpdate,
    ) -> DbResult<()>;

    /// Upsert from an upstream `/session/**` response body
    async fn sync_from_upstream(&self, user_id: &str, sync: UpstreamSessionSync) -> DbResult<()>;

    /// Upsert session state from a webhook event, keyed by session token
    async fn apply_session_event(&self, token: &str, update: SessionEventUpdate) -> DbResult<()>;

    /// Record a send outcome with DB-level arithmetic on the counters
    async fn record_send_outcome(&self, id: i64, success: bool) -> DbResult<()>;

    /// Delete a session owned by the user; returns whether a row was removed
    async fn delete(&self, user_id: &str, session_id: &str) -> DbResult<bool>;
}

/// Create session input
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: String,
    pub provider: String,
    pub session_id: String,
    pub session_name: Option<String>,
    pub session_token: String,
    pub webhook_url: Option<String>,
    pub auto_read_enabled: bool,
    pub typing_enabled: bool,
    pub chat_log_enabled: bool,
    pub status: String,
}

/// Partial settings update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct SessionSettingsUpdate {
    pub session_name: Option<String>,
    pub webhook_url: Option<String>,
    pub auto_read_enabled: Option<bool>,
    pub typing_enabled: Option<bool>,
    pub chat_log_enabled: Option<bool>,
}

/// Fields parsed from an upstream session response
#[derive(Debug, Clone)]
pub struct UpstreamSessionSync {
    pub session_id: String,
    pub session_name: Option<String>,
    pub session_token: Option<String>,
    pub jid: Option<String>,
    pub status: Option<String>,
    pub connected: bool,
    pub logged_in: bool,
}

/// Session-state transition carried by a webhook event
#[derive(Debug, Clone)]
pub struct SessionEventUpdate {
    pub status: String,
    pub connected: bool,
    pub logged_in: bool,
    pub qr_code: Option<String>,
    pub qr_expired_at: Option<DateTime<Utc>>,
    pub connected_at: Option<DateTime<Utc>>,
    pub disconnected_at: Option<DateTime<Utc>>,
}

/// Message statistics repository trait
#[async_trait]
pub trait MessageStatRepository: Send + Sync {
    /// Insert-or-increment the `(user, session, type)` counters.
    ///
    /// `sent`/`failed` are deltas; `last_success_at`/`last_failed_at` are
    /// stamped only for the non-zero side.
    async fn increment(
        &self,
        user_id: &str,
        session_id: &str,
        message_type: &str,
        sent: i64,
        failed: i64,
    ) -> DbResult<()>;

    /// Fetch one stat row
    async fn get(
        &self,
        user_id: &str,
        session_id: &str,
        message_type: &str,
    ) -> DbResult<Option<MessageStatRow>>;

    /// All stat rows for a session
    async fn list_for_session(&self, user_id: &str, session_id: &str)
        -> DbResult<Vec<MessageStatRow>>;
}

/// Contact repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Upsert a contact on `(user, session, jid)`
    async fn upsert(&self, contact: UpsertContact) -> DbResult<()>;

    /// List contacts for a session ordered by name
    async fn list(&self, user_id: &str, session_id: &str) -> DbResult<Vec<ContactRow>>;

    /// Delete specific contacts by JID; returns rows removed
    async fn delete_many(&self, user_id: &str, session_id: &str, jids: &[String])
        -> DbResult<u64>;

    /// Delete all contacts for a session; returns rows removed
    async fn delete_all(&self, user_id: &str, session_id: &str) -> DbResult<u64>;
}

/// Upsert contact input
#[derive(Debug, Clone)]
pub struct UpsertContact {
    pub user_id: String,
    pub session_id: String,
    pub jid: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub raw: serde_json::Value,
    pub synced_at: DateTime<Utc>,
}

/// Campaign template repository trait
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Create a campaign template
    async fn create(&self, campaign: CreateCampaign) -> DbResult<CampaignRow>;

    /// List templates for a user
    async fn list(&self, user_id: &str) -> DbResult<Vec<CampaignRow>>;

    /// Find a template owned by the user
    async fn find(&self, user_id: &str, id: i64) -> DbResult<Option<CampaignRow>>;

    /// Patch a template (type is immutable); returns the updated row
    async fn update(&self, user_id: &str, id: i64, update: UpdateCampaign)
        -> DbResult<Option<CampaignRow>>;

    /// Delete a template; returns whether a row was removed
    async fn delete(&self, user_id: &str, id: i64) -> DbResult<bool>;
}

/// Create campaign input
#[derive(Debug, Clone)]
pub struct CreateCampaign {
    pub user_id: String,
    pub name: String,
    pub campaign_type: String,
    pub message_body: Option<String>,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
    pub caption: Option<String>,
}

/// Partial campaign update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateCampaign {
    pub name: Option<String>,
    pub status: Option<String>,
    pub message_body: Option<String>,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
    pub caption: Option<String>,
}

/// Bulk campaign repository trait
#[async_trait]
pub trait BulkCampaignRepository: Send + Sync {
    /// Create the bulk campaign and one item per phone in a single
    /// transaction
    async fn create_with_items(
        &self,
        bulk: CreateBulkCampaign,
        phones: &[String],
    ) -> DbResult<BulkCampaignRow>;

    /// List executions for a user, newest first
    async fn list(&self, user_id: &str) -> DbResult<Vec<BulkCampaignRow>>;

    /// Find an execution owned by the user
    async fn find(&self, user_id: &str, id: i64) -> DbResult<Option<BulkCampaignRow>>;

    /// Find an execution by id regardless of owner (dispatcher path)
    async fn find_by_id(&self, id: i64) -> DbResult<Option<BulkCampaignRow>>;

    /// Delete an execution and its items; returns whether a row was removed
    async fn delete(&self, user_id: &str, id: i64) -> DbResult<bool>;

    /// IDs of scheduled campaigns whose time has come
    async fn due_scheduled(&self, now: DateTime<Utc>) -> DbResult<Vec<i64>>;

    /// Compare-and-set `{pending, scheduled} → processing`, stamping
    /// `processed_at`. Returns false when another dispatcher won the race.
    async fn claim_for_processing(&self, id: i64, now: DateTime<Utc>) -> DbResult<bool>;

    /// Items of a campaign in creation order
    async fn items(&self, bulk_campaign_id: i64) -> DbResult<Vec<BulkItemRow>>;

    /// Mark one item sent, stamp `sent_at`, bump the parent sent counter
    async fn mark_item_sent(
        &self,
        item_id: i64,
        bulk_campaign_id: i64,
        message_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()>;

    /// Mark one item failed, record the error, bump the parent failed counter
    async fn mark_item_failed(
        &self,
        item_id: i64,
        bulk_campaign_id: i64,
        error: &str,
    ) -> DbResult<()>;

    /// Enter a terminal status, stamping `completed_at`
    async fn finalize(
        &self,
        id: i64,
        status: &str,
        error_message: Option<&str>,
        at: DateTime<Utc>,
    ) -> DbResult<()>;
}

/// Create bulk campaign input (content snapshot included)
#[derive(Debug, Clone)]
pub struct CreateBulkCampaign {
    pub user_id: String,
    pub campaign_id: Option<i64>,
    pub name: String,
    pub campaign_type: String,
    pub message_body: Option<String>,
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
    pub caption: Option<String>,
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
}

/// Raw webhook event repository trait
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Append the raw envelope; returns the new row id
    async fn insert(&self, event: CreateWebhookEvent) -> DbResult<i64>;

    /// Mark an envelope processed
    async fn mark_processed(&self, id: i64, at: DateTime<Utc>) -> DbResult<()>;

    /// Leave an envelope unprocessed after a handler failure
    async fn mark_unprocessed(&self, id: i64) -> DbResult<()>;
}

/// Create webhook event input
#[derive(Debug, Clone)]
pub struct CreateWebhookEvent {
    pub event_type: String,
    pub source: String,
    pub user_token: String,
    pub event_data: serde_json::Value,
    pub raw_data: String,
}

/// Typed chat-domain repository trait (messages, receipts, statuses,
/// presence, history, chat rooms)
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert a message; duplicate `message_id` per token is a silent no-op.
    /// Returns whether a row was written.
    async fn insert_message(&self, message: CreateWaMessage) -> DbResult<bool>;

    /// Current delivery status of a stored message
    async fn message_status(&self, message_id: &str, user_token: &str)
        -> DbResult<Option<String>>;

    /// Set a message's delivery status (caller enforces progression)
    async fn set_message_status(
        &self,
        message_id: &str,
        user_token: &str,
        status: &str,
    ) -> DbResult<()>;

    /// Whether this exact receipt was already recorded
    async fn receipt_exists(
        &self,
        message_ids: &serde_json::Value,
        receipt_type: &str,
        user_token: &str,
    ) -> DbResult<bool>;

    /// Record a read receipt
    async fn insert_receipt(&self, receipt: CreateReadReceipt) -> DbResult<()>;

    /// Whether this exact `(message_id, status)` was already recorded
    async fn status_exists(&self, message_id: &str, status: &str, user_token: &str)
        -> DbResult<bool>;

    /// Record a message status row
    async fn insert_status(&self, status: CreateMessageStatus) -> DbResult<()>;

    /// Record a presence event
    async fn insert_presence(&self, presence: CreatePresence) -> DbResult<()>;

    /// Upsert the latest chat presence per `(from, chat, token)`
    async fn upsert_chat_presence(&self, presence: UpsertChatPresence) -> DbResult<()>;

    /// Auto-expire a composing state iff `expires_at` is unchanged.
    /// Returns rows affected (0 when a newer composing superseded us).
    async fn expire_chat_presence(
        &self,
        from_jid: &str,
        chat_jid: &str,
        user_token: &str,
        expires_at: DateTime<Utc>,
    ) -> DbResult<u64>;

    /// Append a history sync record
    async fn insert_history_sync(&self, sync: CreateHistorySync) -> DbResult<()>;

    /// Create or update a chat room; bumps the unread counter for
    /// contact-sent messages
    async fn upsert_chat_room(&self, room: UpsertChatRoom) -> DbResult<()>;

    /// Append a chat message; duplicate `message_id` is a silent no-op
    async fn insert_chat_message(&self, message: CreateChatMessage) -> DbResult<bool>;

    /// Advance a chat message's status, stamping `delivered_at`/`read_at`
    async fn advance_chat_message(
        &self,
        message_id: &str,
        status: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()>;
}

/// Create WhatsApp message input
#[derive(Debug, Clone)]
pub struct CreateWaMessage {
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
}

/// Create read receipt input
#[derive(Debug, Clone)]
pub struct CreateReadReceipt {
    pub message_ids: serde_json::Value,
    pub from_jid: String,
    pub to_jid: String,
    pub receipt_type: String,
    pub event_timestamp: DateTime<Utc>,
    pub user_token: String,
}

/// Create message status input
#[derive(Debug, Clone)]
pub struct CreateMessageStatus {
    pub message_id: String,
    pub status: String,
    pub event_timestamp: DateTime<Utc>,
    pub user_token: String,
}

/// Create presence input
#[derive(Debug, Clone)]
pub struct CreatePresence {
    pub from_jid: String,
    pub presence: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub user_token: String,
}

/// Upsert chat presence input
#[derive(Debug, Clone)]
pub struct UpsertChatPresence {
    pub from_jid: String,
    pub chat_jid: String,
    pub state: String,
    pub media: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_token: String,
}

/// Create history sync input
#[derive(Debug, Clone)]
pub struct CreateHistorySync {
    pub sync_type: String,
    pub conversations: serde_json::Value,
    pub user_token: String,
}

/// Upsert chat room input
#[derive(Debug, Clone)]
pub struct UpsertChatRoom {
    pub chat_id: String,
    pub user_token: String,
    pub contact_jid: String,
    pub contact_name: Option<String>,
    pub is_group: bool,
    pub last_message: String,
    pub last_sender: String,
    pub last_activity: DateTime<Utc>,
}

/// Create chat message input
#[derive(Debug, Clone)]
pub struct CreateChatMessage {
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
}
