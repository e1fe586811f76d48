//! PostgreSQL chat-domain repository implementation
//!
//! Covers the typed records fanned out by webhook intake: messages, read
//! receipts, message statuses, presence, history syncs, chat rooms and
//! chat messages. Idempotency is enforced here with unique indexes and
//! `ON CONFLICT DO NOTHING` so re-delivered events are silent no-ops.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::repo::{
    ChatRepository, CreateChatMessage, CreateHistorySync, CreateMessageStatus, CreatePresence,
    CreateReadReceipt, CreateWaMessage, UpsertChatPresence, UpsertChatRoom,
};

/// PostgreSQL chat-domain repository
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    /// Create a new chat repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn insert_message(&self, message: CreateWaMessage) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO wa_messages (message_id, from_jid, to_jid, from_me, push_name,
                                     message_type, body, caption, media, quoted, group_jid,
                                     participant, status, message_timestamp, user_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (user_token, message_id) DO NOTHING
            "#,
        )
        .bind(&message.message_id)
        .bind(&message.from_jid)
        .bind(&message.to_jid)
        .bind(message.from_me)
        .bind(&message.push_name)
        .bind(&message.message_type)
        .bind(&message.body)
        .bind(&message.caption)
        .bind(&message.media)
        .bind(&message.quoted)
        .bind(&message.group_jid)
        .bind(&message.participant)
        .bind(&message.status)
        .bind(message.message_timestamp)
        .bind(&message.user_token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn message_status(
        &self,
        message_id: &str,
        user_token: &str,
    ) -> DbResult<Option<String>> {
        let status: Option<(String,)> = sqlx::query_as(
            "SELECT status FROM wa_messages WHERE message_id = $1 AND user_token = $2",
        )
        .bind(message_id)
        .bind(user_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(status.map(|(s,)| s))
    }

    async fn set_message_status(
        &self,
        message_id: &str,
        user_token: &str,
        status: &str,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE wa_messages SET status = $3 WHERE message_id = $1 AND user_token = $2",
        )
        .bind(message_id)
        .bind(user_token)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn receipt_exists(
        &self,
        message_ids: &serde_json::Value,
        receipt_type: &str,
        user_token: &str,
    ) -> DbResult<bool> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM read_receipts
            WHERE message_ids = $1 AND receipt_type = $2 AND user_token = $3
            "#,
        )
        .bind(message_ids)
        .bind(receipt_type)
        .bind(user_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    async fn insert_receipt(&self, receipt: CreateReadReceipt) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO read_receipts (message_ids, from_jid, to_jid, receipt_type,
                                       event_timestamp, user_token)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&receipt.message_ids)
        .bind(&receipt.from_jid)
        .bind(&receipt.to_jid)
        .bind(&receipt.receipt_type)
        .bind(receipt.event_timestamp)
        .bind(&receipt.user_token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn status_exists(
        &self,
        message_id: &str,
        status: &str,
        user_token: &str,
    ) -> DbResult<bool> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM message_statuses
            WHERE message_id = $1 AND status = $2 AND user_token = $3
            "#,
        )
        .bind(message_id)
        .bind(status)
        .bind(user_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    async fn insert_status(&self, status: CreateMessageStatus) -> DbResult<()> {
        // Unique index backs the exists-check against races; a concurrent
        // duplicate lands on DO NOTHING.
        sqlx::query(
            r#"
            INSERT INTO message_statuses (message_id, status, event_timestamp, user_token)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id, status, user_token) DO NOTHING
            "#,
        )
        .bind(&status.message_id)
        .bind(&status.status)
        .bind(status.event_timestamp)
        .bind(&status.user_token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_presence(&self, presence: CreatePresence) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO presences (from_jid, presence, last_seen, user_token)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&presence.from_jid)
        .bind(&presence.presence)
        .bind(presence.last_seen)
        .bind(&presence.user_token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_chat_presence(&self, presence: UpsertChatPresence) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_presences (from_jid, chat_jid, state, media, auto_stopped,
                                        expires_at, user_token)
            VALUES ($1, $2, $3, $4, FALSE, $5, $6)
            ON CONFLICT (from_jid, chat_jid, user_token)
            DO UPDATE SET state = EXCLUDED.state,
                          media = EXCLUDED.media,
                          auto_stopped = FALSE,
                          expires_at = EXCLUDED.expires_at,
                          updated_at = NOW()
            "#,
        )
        .bind(&presence.from_jid)
        .bind(&presence.chat_jid)
        .bind(&presence.state)
        .bind(&presence.media)
        .bind(presence.expires_at)
        .bind(&presence.user_token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn expire_chat_presence(
        &self,
        from_jid: &str,
        chat_jid: &str,
        user_token: &str,
        expires_at: DateTime<Utc>,
    ) -> DbResult<u64> {
        // The expires_at equality check makes a superseded timer a no-op:
        // a newer composing event rewrites expires_at before we wake.
        let result = sqlx::query(
            r#"
            UPDATE chat_presences
            SET state = 'paused', auto_stopped = TRUE, updated_at = NOW()
            WHERE from_jid = $1 AND chat_jid = $2 AND user_token = $3
              AND state = 'composing' AND expires_at = $4
            "#,
        )
        .bind(from_jid)
        .bind(chat_jid)
        .bind(user_token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_history_sync(&self, sync: CreateHistorySync) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO history_syncs (sync_type, conversations, user_token)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&sync.sync_type)
        .bind(&sync.conversations)
        .bind(&sync.user_token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_chat_room(&self, room: UpsertChatRoom) -> DbResult<()> {
        let chat_type = if room.is_group { "group" } else { "individual" };
        let group_name = room.is_group.then(|| room.contact_name.clone()).flatten();

        sqlx::query(
            r#"
            INSERT INTO chat_rooms (chat_id, user_token, contact_jid, contact_name, chat_type,
                                    is_group, group_name, last_message, last_sender,
                                    last_activity, unread_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0)
            ON CONFLICT (chat_id)
            DO UPDATE SET contact_name = COALESCE(NULLIF(EXCLUDED.contact_name, ''),
                                                  chat_rooms.contact_name),
                          group_name = COALESCE(NULLIF(EXCLUDED.group_name, ''),
                                                chat_rooms.group_name),
                          last_message = EXCLUDED.last_message,
                          last_sender = EXCLUDED.last_sender,
                          last_activity = EXCLUDED.last_activity,
                          unread_count = chat_rooms.unread_count
                              + CASE WHEN EXCLUDED.last_sender = 'contact' THEN 1 ELSE 0 END,
                          updated_at = NOW()
            "#,
        )
        .bind(&room.chat_id)
        .bind(&room.user_token)
        .bind(&room.contact_jid)
        .bind(&room.contact_name)
        .bind(chat_type)
        .bind(room.is_group)
        .bind(&group_name)
        .bind(&room.last_message)
        .bind(&room.last_sender)
        .bind(room.last_activity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_chat_message(&self, message: CreateChatMessage) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO chat_messages (message_id, chat_id, user_token, sender_jid, sender_type,
                                       message_type, content, caption, media, quoted_message_id,
                                       status, message_timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (message_id) DO NOTHING
            "#,
        )
        .bind(&message.message_id)
        .bind(&message.chat_id)
        .bind(&message.user_token)
        .bind(&message.sender_jid)
        .bind(&message.sender_type)
        .bind(&message.message_type)
        .bind(&message.content)
        .bind(&message.caption)
        .bind(&message.media)
        .bind(&message.quoted_message_id)
        .bind(&message.status)
        .bind(message.message_timestamp)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn advance_chat_message(
        &self,
        message_id: &str,
        status: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE chat_messages
            SET status = $2,
                delivered_at = CASE WHEN $2 = 'delivered' THEN $3 ELSE delivered_at END,
                read_at = CASE WHEN $2 = 'read' THEN $3 ELSE read_at END
            WHERE message_id = $1
            "#,
        )
        .bind(message_id)
        .bind(status)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
