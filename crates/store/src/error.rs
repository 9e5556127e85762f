use thiserror::Error;

/// Errors that can occur when interacting with the inventory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint was violated.
    #[error("Duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// A stored row could not be decoded into its record type.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
