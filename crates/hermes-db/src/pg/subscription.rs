//! PostgreSQL subscription repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::SubscriptionRow;
use crate::repo::{SubscriptionRepository, UpsertSubscription};

/// PostgreSQL subscription repository
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_active(
        &self,
        user_id: &str,
        provider: &str,
    ) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, provider, max_sessions, max_messages, expires_at,
                   status, created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1 AND provider = $2 AND status = 'active'
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(provider)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn find_latest(
        &self,
        user_id: &str,
        provider: &str,
    ) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, provider, max_sessions, max_messages, expires_at,
                   status, created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1 AND provider = $2
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(provider)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn upsert(&self, sub: UpsertSubscription) -> DbResult<SubscriptionRow> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions (user_id, provider, max_sessions, max_messages, expires_at, status)
            VALUES ($1, $2, $3, $4, $5, 'active')
            ON CONFLICT (user_id, provider)
            DO UPDATE SET max_sessions = EXCLUDED.max_sessions,
                          max_messages = EXCLUDED.max_messages,
                          expires_at = EXCLUDED.expires_at,
                          status = 'active',
                          updated_at = NOW()
            RETURNING id, user_id, provider, max_sessions, max_messages, expires_at,
                      status, created_at, updated_at
            "#,
        )
        .bind(&sub.user_id)
        .bind(&sub.provider)
        .bind(sub.max_sessions)
        .bind(sub.max_messages)
        .bind(sub.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_expired(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE subscriptions SET status = 'expired', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'active' AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
