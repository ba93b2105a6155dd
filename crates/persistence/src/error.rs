//! # Persistence Errors
//!
//! Error types cho persistence layer, wrapping sqlx errors.

use grossbook_core::{CoreError, UserId};
use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("user with id {0} doesn't exist")]
    UserNotFound(UserId),

    #[error("there is no db connection")]
    NotConnected,

    #[error("incorrect limit value: {0}")]
    InvalidLimit(i64),

    /// Stored balance changed between load and commit
    #[error("balance of user {0} was modified concurrently")]
    Conflict(UserId),

    #[error("operation rejected: {0}")]
    Rejected(#[from] CoreError),

    // === Database errors ===
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // === Conversion errors ===
    #[error("Invalid decimal value: {0}")]
    InvalidDecimal(String),

    #[error("Invalid timestamp value: {0}")]
    InvalidTimestamp(String),
}

/// Result type alias cho PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => Self::NotConnected,
            other => Self::Database(other),
        }
    }
}

impl PersistenceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_))
    }

    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Migration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_closed_maps_to_not_connected() {
        let err = PersistenceError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, PersistenceError::NotConnected));

        let err = PersistenceError::from(sqlx::Error::RowNotFound);
        assert!(err.is_database_error());
    }

    #[test]
    fn test_core_error_is_wrapped() {
        let err: PersistenceError = CoreError::ZeroAmount.into();
        assert!(matches!(err, PersistenceError::Rejected(CoreError::ZeroAmount)));
        assert!(!err.is_not_found());
        assert!(PersistenceError::UserNotFound(3).is_not_found());
    }
}
