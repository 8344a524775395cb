//! Store Errors

/// Errors from the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error (embedded JSON metadata)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted row no longer satisfies domain validation
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Timeout/connection class failures the caller may retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = StoreError::Database(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
    }

    #[test]
    fn test_corrupt_row_is_not_transient() {
        let err = StoreError::Corrupt("negative balance".to_string());
        assert!(!err.is_transient());
    }
}
