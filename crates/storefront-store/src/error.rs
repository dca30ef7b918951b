//! Error types for storefront storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// A unique insert lost to an earlier writer.
    ///
    /// The only benign insert failure: callers treat it as "someone already
    /// did this" and read back the winner. Every other variant is a real
    /// fault.
    #[error("duplicate key in {keyspace}: {key}")]
    DuplicateKey {
        /// Column family where the conflict occurred.
        keyspace: &'static str,
        /// The conflicting key, rendered for logging.
        key: String,
    },
}

impl StoreError {
    /// Whether this error is a benign first-writer-wins conflict.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}
