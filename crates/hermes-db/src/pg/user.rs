//! PostgreSQL service user repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::ServiceUserRow;
use crate::repo::{CreateServiceUser, UserRepository};

/// PostgreSQL service user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: &str) -> DbResult<Option<ServiceUserRow>> {
        let user = sqlx::query_as::<_, ServiceUserRow>(
            r#"
            SELECT user_id, source_service, api_key_hash, status, created_by,
                   created_at, updated_at
            FROM service_users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_api_key_hash(&self, hash: &str) -> DbResult<Option<ServiceUserRow>> {
        let user = sqlx::query_as::<_, ServiceUserRow>(
            r#"
            SELECT user_id, source_service, api_key_hash, status, created_by,
                   created_at, updated_at
            FROM service_users
            WHERE api_key_hash = $1
            "#,
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list(
        &self,
        source: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<ServiceUserRow>> {
        let users = sqlx::query_as::<_, ServiceUserRow>(
            r#"
            SELECT user_id, source_service, api_key_hash, status, created_by,
                   created_at, updated_at
            FROM service_users
            WHERE ($1::text IS NULL OR source_service = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(source)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn count(&self, source: Option<&str>) -> DbResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM service_users
            WHERE ($1::text IS NULL OR source_service = $1)
            "#,
        )
        .bind(source)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn create(&self, user: CreateServiceUser) -> DbResult<ServiceUserRow> {
        let row = sqlx::query_as::<_, ServiceUserRow>(
            r#"
            INSERT INTO service_users (user_id, source_service, api_key_hash, status, created_by)
            VALUES ($1, $2, $3, 'active', $4)
            RETURNING user_id, source_service, api_key_hash, status, created_by,
                      created_at, updated_at
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.source_service)
        .bind(&user.api_key_hash)
        .bind(&user.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_source(&self, user_id: &str, source: &str) -> DbResult<()> {
        sqlx::query("UPDATE service_users SET source_service = $1, updated_at = NOW() WHERE user_id = $2")
            .bind(source)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_api_key_hash(&self, user_id: &str, hash: &str) -> DbResult<()> {
        sqlx::query("UPDATE service_users SET api_key_hash = $1, updated_at = NOW() WHERE user_id = $2")
            .bind(hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn belongs_to_source(&self, user_id: &str, source: &str) -> DbResult<bool> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM service_users WHERE user_id = $1 AND source_service = $2",
        )
        .bind(user_id)
        .bind(source)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }
}
