//! PostgreSQL webhook event repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::repo::{CreateWebhookEvent, WebhookEventRepository};

/// PostgreSQL webhook event repository. The table is append-only; rows are
/// only ever flagged processed/unprocessed after the fact.
#[derive(Clone)]
pub struct PgWebhookEventRepository {
    pool: PgPool,
}

impl PgWebhookEventRepository {
    /// Create a new webhook event repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventRepository for PgWebhookEventRepository {
    async fn insert(&self, event: CreateWebhookEvent) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO webhook_events (event_type, source, user_token, event_data, raw_data, processed)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING id
            "#,
        )
        .bind(&event.event_type)
        .bind(&event.source)
        .bind(&event.user_token)
        .bind(&event.event_data)
        .bind(&event.raw_data)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn mark_processed(&self, id: i64, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE webhook_events SET processed = TRUE, processed_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_unprocessed(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE webhook_events SET processed = FALSE, processed_at = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
