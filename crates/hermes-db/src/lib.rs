//! Hermes DB - PostgreSQL persistence layer
//!
//! Row models map 1:1 to tables via SQLx's `FromRow`; access goes through
//! `#[async_trait]` repository traits with `Pg*Repository` implementations.
//! Counter updates always use DB-level arithmetic (`x = x + 1`) so
//! concurrent writers never lose increments.

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use pool::{create_pool, DbPool};

/// Apply pending schema migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
