//! PostgreSQL contact repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::ContactRow;
use crate::repo::{ContactRepository, UpsertContact};

/// PostgreSQL contact repository
#[derive(Clone)]
pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    /// Create a new contact repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn upsert(&self, contact: UpsertContact) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO contacts (user_id, session_id, jid, name, phone, raw, last_synced_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, session_id, jid)
            DO UPDATE SET name = EXCLUDED.name,
                          phone = EXCLUDED.phone,
                          raw = EXCLUDED.raw,
                          last_synced_at = EXCLUDED.last_synced_at,
                          updated_at = NOW()
            "#,
        )
        .bind(&contact.user_id)
        .bind(&contact.session_id)
        .bind(&contact.jid)
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(&contact.raw)
        .bind(contact.synced_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, user_id: &str, session_id: &str) -> DbResult<Vec<ContactRow>> {
        let contacts = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, user_id, session_id, jid, name, phone, raw, last_synced_at,
                   created_at, updated_at
            FROM contacts
            WHERE user_id = $1 AND session_id = $2
            ORDER BY name ASC NULLS LAST
            "#,
        )
        .bind(user_id)
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(contacts)
    }

    async fn delete_many(
        &self,
        user_id: &str,
        session_id: &str,
        jids: &[String],
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "DELETE FROM contacts WHERE user_id = $1 AND session_id = $2 AND jid = ANY($3)",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(jids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self, user_id: &str, session_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM contacts WHERE user_id = $1 AND session_id = $2")
            .bind(user_id)
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
