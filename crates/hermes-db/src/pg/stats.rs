//! PostgreSQL message statistics repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::MessageStatRow;
use crate::repo::MessageStatRepository;

/// PostgreSQL message statistics repository
#[derive(Clone)]
pub struct PgMessageStatRepository {
    pool: PgPool,
}

impl PgMessageStatRepository {
    /// Create a new message statistics repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStatRepository for PgMessageStatRepository {
    async fn increment(
        &self,
        user_id: &str,
        session_id: &str,
        message_type: &str,
        sent: i64,
        failed: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO message_stats (user_id, session_id, message_type, total_sent, total_failed,
                                       last_success_at, last_failed_at)
            VALUES ($1, $2, $3, $4, $5,
                    CASE WHEN $4 > 0 THEN NOW() END,
                    CASE WHEN $5 > 0 THEN NOW() END)
            ON CONFLICT (user_id, session_id, message_type)
            DO UPDATE SET total_sent = message_stats.total_sent + EXCLUDED.total_sent,
                          total_failed = message_stats.total_failed + EXCLUDED.total_failed,
                          last_success_at = CASE WHEN EXCLUDED.total_sent > 0
                                                 THEN NOW() ELSE message_stats.last_success_at END,
                          last_failed_at = CASE WHEN EXCLUDED.total_failed > 0
                                                THEN NOW() ELSE message_stats.last_failed_at END,
                          updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(message_type)
        .bind(sent)
        .bind(failed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        user_id: &str,
        session_id: &str,
        message_type: &str,
    ) -> DbResult<Option<MessageStatRow>> {
        let stat = sqlx::query_as::<_, MessageStatRow>(
            r#"
            SELECT id, user_id, session_id, message_type, total_sent, total_failed,
                   last_success_at, last_failed_at, created_at, updated_at
            FROM message_stats
            WHERE user_id = $1 AND session_id = $2 AND message_type = $3
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .bind(message_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stat)
    }

    async fn list_for_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> DbResult<Vec<MessageStatRow>> {
        let stats = sqlx::query_as::<_, MessageStatRow>(
            r#"
            SELECT id, user_id, session_id, message_type, total_sent, total_failed,
                   last_success_at, last_failed_at, created_at, updated_at
            FROM message_stats
            WHERE user_id = $1 AND session_id = $2
            ORDER BY message_type
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }
}
