//! PostgreSQL bulk campaign repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::{BulkCampaignRow, BulkItemRow};
use crate::repo::{BulkCampaignRepository, CreateBulkCampaign};

const BULK_COLUMNS: &str = r#"
    id, user_id, campaign_id, name, campaign_type, message_body, image_url,
    image_base64, caption, status, total_count, sent_count, failed_count,
    scheduled_at, timezone, processed_at, completed_at, error_message,
    created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, bulk_campaign_id, phone, status, message_id, error_message, sent_at,
    created_at, updated_at
"#;

/// PostgreSQL bulk campaign repository
#[derive(Clone)]
pub struct PgBulkCampaignRepository {
    pool: PgPool,
}

impl PgBulkCampaignRepository {
    /// Create a new bulk campaign repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BulkCampaignRepository for PgBulkCampaignRepository {
    async fn create_with_items(
        &self,
        bulk: CreateBulkCampaign,
        phones: &[String],
    ) -> DbResult<BulkCampaignRow> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BulkCampaignRow>(&format!(
            r#"
            INSERT INTO bulk_campaigns (user_id, campaign_id, name, campaign_type, message_body,
                                        image_url, image_base64, caption, status, total_count,
                                        scheduled_at, timezone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {BULK_COLUMNS}
            "#
        ))
        .bind(&bulk.user_id)
        .bind(bulk.campaign_id)
        .bind(&bulk.name)
        .bind(&bulk.campaign_type)
        .bind(&bulk.message_body)
        .bind(&bulk.image_url)
        .bind(&bulk.image_base64)
        .bind(&bulk.caption)
        .bind(&bulk.status)
        .bind(phones.len() as i32)
        .bind(bulk.scheduled_at)
        .bind(&bulk.timezone)
        .fetch_one(&mut *tx)
        .await?;

        // One item per recipient. WITH ORDINALITY pins item ids to the
        // request order, which the dispatcher relies on.
        sqlx::query(
            r#"
            INSERT INTO bulk_campaign_items (bulk_campaign_id, phone, status)
            SELECT $1, t.phone, 'pending'
            FROM UNNEST($2::text[]) WITH ORDINALITY AS t(phone, ord)
            ORDER BY t.ord
            "#,
        )
        .bind(row.id)
        .bind(phones)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row)
    }

    async fn list(&self, user_id: &str) -> DbResult<Vec<BulkCampaignRow>> {
        let rows = sqlx::query_as::<_, BulkCampaignRow>(&format!(
            "SELECT {BULK_COLUMNS} FROM bulk_campaigns WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find(&self, user_id: &str, id: i64) -> DbResult<Option<BulkCampaignRow>> {
        let row = sqlx::query_as::<_, BulkCampaignRow>(&format!(
            "SELECT {BULK_COLUMNS} FROM bulk_campaigns WHERE user_id = $1 AND id = $2"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<BulkCampaignRow>> {
        let row = sqlx::query_as::<_, BulkCampaignRow>(&format!(
            "SELECT {BULK_COLUMNS} FROM bulk_campaigns WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, user_id: &str, id: i64) -> DbResult<bool> {
        // Items cascade via the foreign key
        let result = sqlx::query("DELETE FROM bulk_campaigns WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn due_scheduled(&self, now: DateTime<Utc>) -> DbResult<Vec<i64>> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT id FROM bulk_campaigns
            WHERE status = 'scheduled' AND scheduled_at <= $1
            ORDER BY scheduled_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn claim_for_processing(&self, id: i64, now: DateTime<Utc>) -> DbResult<bool> {
        // CAS guard: a losing racer (or a finished campaign) affects no rows.
        let result = sqlx::query(
            r#"
            UPDATE bulk_campaigns
            SET status = 'processing', processed_at = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'scheduled')
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn items(&self, bulk_campaign_id: i64) -> DbResult<Vec<BulkItemRow>> {
        let items = sqlx::query_as::<_, BulkItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bulk_campaign_items WHERE bulk_campaign_id = $1 ORDER BY id ASC"
        ))
        .bind(bulk_campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn mark_item_sent(
        &self,
        item_id: i64,
        bulk_campaign_id: i64,
        message_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE bulk_campaign_items
            SET status = 'sent', message_id = $2, sent_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(message_id)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE bulk_campaigns SET sent_count = sent_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(bulk_campaign_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn mark_item_failed(
        &self,
        item_id: i64,
        bulk_campaign_id: i64,
        error: &str,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE bulk_campaign_items
            SET status = 'failed', error_message = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(error)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE bulk_campaigns SET failed_count = failed_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(bulk_campaign_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn finalize(
        &self,
        id: i64,
        status: &str,
        error_message: Option<&str>,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE bulk_campaigns
            SET status = $2,
                error_message = COALESCE($3, error_message),
                completed_at = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error_message)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
