//! PostgreSQL campaign template repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::CampaignRow;
use crate::repo::{CampaignRepository, CreateCampaign, UpdateCampaign};

const CAMPAIGN_COLUMNS: &str = r#"
    id, user_id, name, campaign_type, status, message_body, image_url,
    image_base64, caption, created_at, updated_at
"#;

/// PostgreSQL campaign template repository
#[derive(Clone)]
pub struct PgCampaignRepository {
    pool: PgPool,
}

impl PgCampaignRepository {
    /// Create a new campaign repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for PgCampaignRepository {
    async fn create(&self, campaign: CreateCampaign) -> DbResult<CampaignRow> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            INSERT INTO campaigns (user_id, name, campaign_type, status, message_body,
                                   image_url, image_base64, caption)
            VALUES ($1, $2, $3, 'active', $4, $5, $6, $7)
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(&campaign.user_id)
        .bind(&campaign.name)
        .bind(&campaign.campaign_type)
        .bind(&campaign.message_body)
        .bind(&campaign.image_url)
        .bind(&campaign.image_base64)
        .bind(&campaign.caption)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list(&self, user_id: &str) -> DbResult<Vec<CampaignRow>> {
        let campaigns = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(campaigns)
    }

    async fn find(&self, user_id: &str, id: i64) -> DbResult<Option<CampaignRow>> {
        let campaign = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE user_id = $1 AND id = $2"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(campaign)
    }

    async fn update(
        &self,
        user_id: &str,
        id: i64,
        update: UpdateCampaign,
    ) -> DbResult<Option<CampaignRow>> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            UPDATE campaigns
            SET name = COALESCE($3, name),
                status = COALESCE($4, status),
                message_body = COALESCE($5, message_body),
                image_url = COALESCE($6, image_url),
                image_base64 = COALESCE($7, image_base64),
                caption = COALESCE($8, caption),
                updated_at = NOW()
            WHERE user_id = $1 AND id = $2
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(id)
        .bind(&update.name)
        .bind(&update.status)
        .bind(&update.message_body)
        .bind(&update.image_url)
        .bind(&update.image_base64)
        .bind(&update.caption)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, user_id: &str, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM campaigns WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
