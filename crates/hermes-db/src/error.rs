//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Duplicate key violation. Webhook intake relies on this variant to
    /// treat re-delivered events as no-ops.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Foreign key violation
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
}

impl DbError {
    /// Check if the error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Check if the error is a duplicate key error
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey(_))
    }
}

/// Result type alias for database operations
pub type DbResult<T> = Result<T, DbError>;

// Map Postgres error codes onto the specific variants
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        // unique_violation
                        "23505" => return Self::DuplicateKey(db_err.message().to_string()),
                        // foreign_key_violation
                        "23503" => return Self::ForeignKeyViolation(db_err.message().to_string()),
                        _ => {}
                    }
                }
                Self::Sqlx(err)
            }
            _ => Self::Sqlx(err),
        }
    }
}

impl From<DbError> for hermes_types::HermesError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => Self::NotFound("record".to_string()),
            other => Self::Database(other.to_string()),
        }
    }
}
