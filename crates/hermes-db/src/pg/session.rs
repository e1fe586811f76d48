//! PostgreSQL session repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::SessionRow;
use crate::repo::{
    CreateSession, SessionEventUpdate, SessionRepository, SessionSettingsUpdate,
    UpstreamSessionSync,
};

const SESSION_COLUMNS: &str = r#"
    id, user_id, provider, session_id, session_name, session_token, webhook_url,
    jid, connected, logged_in, status, auto_read_enabled, typing_enabled,
    chat_log_enabled, qr_code, qr_expired_at, connected_at, disconnected_at,
    last_message_sent, last_message_fail, last_synced_at, last_activity_at,
    created_at, updated_at
"#;

/// PostgreSQL session repository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find_by_token(&self, token: &str) -> DbResult<Option<SessionRow>> {
        let session = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE session_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_by_session_id(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> DbResult<Option<SessionRow>> {
        let session = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = $1 AND session_id = $2"
        ))
        .bind(user_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_by_user(&self, user_id: &str) -> DbResult<Vec<SessionRow>> {
        let sessions = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = $1 ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn latest_connected(&self, user_id: &str) -> DbResult<Option<SessionRow>> {
        let session = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM sessions
            WHERE user_id = $1 AND connected = TRUE
            ORDER BY updated_at DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn count_connected(&self, user_id: &str) -> DbResult<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE user_id = $1 AND connected = TRUE")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }

    async fn count_active(&self, user_id: &str) -> DbResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM sessions
            WHERE user_id = $1 AND status IN ('active', 'connected', 'qr_waiting', 'created')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn create(&self, session: CreateSession) -> DbResult<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            INSERT INTO sessions (user_id, provider, session_id, session_name, session_token,
                                  webhook_url, auto_read_enabled, typing_enabled,
                                  chat_log_enabled, status, last_synced_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(&session.user_id)
        .bind(&session.provider)
        .bind(&session.session_id)
        .bind(&session.session_name)
        .bind(&session.session_token)
        .bind(&session.webhook_url)
        .bind(session.auto_read_enabled)
        .bind(session.typing_enabled)
        .bind(session.chat_log_enabled)
        .bind(&session.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_settings(
        &self,
        user_id: &str,
        session_id: &str,
        update: SessionSettingsUpdate,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET session_name = COALESCE($3, session_name),
                webhook_url = COALESCE($4, webhook_url),
                auto_read_enabled = COALESCE($5, auto_read_enabled),
                typing_enabled = COALESCE($6, typing_enabled),
                chat_log_enabled = COALESCE($7, chat_log_enabled),
                updated_at = NOW()
            WHERE user_id = $1 AND session_id = $2
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(&update.session_name)
        .bind(&update.webhook_url)
        .bind(update.auto_read_enabled)
        .bind(update.typing_enabled)
        .bind(update.chat_log_enabled)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn sync_from_upstream(&self, user_id: &str, sync: UpstreamSessionSync) -> DbResult<()> {
        // Insert-or-update on (user_id, session_id). An empty token from the
        // upstream never clobbers the stored secret.
        sqlx::query(
            r#"
            INSERT INTO sessions (user_id, provider, session_id, session_name, session_token,
                                  jid, status, connected, logged_in, last_synced_at)
            VALUES ($1, 'hermes-wa', $2, $3, COALESCE($4, ''), $5, COALESCE($6, 'unknown'),
                    $7, $8, NOW())
            ON CONFLICT (user_id, session_id)
            DO UPDATE SET session_name = COALESCE(EXCLUDED.session_name, sessions.session_name),
                          session_token = CASE
                              WHEN EXCLUDED.session_token <> '' THEN EXCLUDED.session_token
                              ELSE sessions.session_token
                          END,
                          jid = COALESCE(EXCLUDED.jid, sessions.jid),
                          status = COALESCE($6, sessions.status),
                          connected = EXCLUDED.connected,
                          logged_in = EXCLUDED.logged_in,
                          last_synced_at = NOW(),
                          updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&sync.session_id)
        .bind(&sync.session_name)
        .bind(&sync.session_token)
        .bind(&sync.jid)
        .bind(&sync.status)
        .bind(sync.connected)
        .bind(sync.logged_in)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn apply_session_event(&self, token: &str, update: SessionEventUpdate) -> DbResult<()> {
        // Session-state webhooks only ever target sessions we provisioned;
        // an unknown token is a no-op for the caller to log.
        sqlx::query(
            r#"
            UPDATE sessions
            SET status = $2,
                connected = $3,
                logged_in = $4,
                qr_code = $5,
                qr_expired_at = $6,
                connected_at = COALESCE($7, connected_at),
                disconnected_at = $8,
                last_activity_at = NOW(),
                updated_at = NOW()
            WHERE session_token = $1
            "#,
        )
        .bind(token)
        .bind(&update.status)
        .bind(update.connected)
        .bind(update.logged_in)
        .bind(&update.qr_code)
        .bind(update.qr_expired_at)
        .bind(update.connected_at)
        .bind(update.disconnected_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_send_outcome(&self, id: i64, success: bool) -> DbResult<()> {
        let (sent, failed) = if success { (1i64, 0i64) } else { (0i64, 1i64) };

        sqlx::query(
            r#"
            UPDATE sessions
            SET last_message_sent = last_message_sent + $2,
                last_message_fail = last_message_fail + $3,
                last_activity_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(sent)
        .bind(failed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, user_id: &str, session_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND session_id = $2")
            .bind(user_id)
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
