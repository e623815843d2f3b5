//! Error types for document store operations.

use thiserror::Error;

/// Error type for document store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A document body could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store lock was poisoned by a panicking holder.
    #[error("Lock error: {0}")]
    Lock(String),

    /// Another live document in the collection already holds this guard key.
    #[error("Duplicate guard key in {collection}: {key}")]
    Duplicate {
        /// Collection the write targeted.
        collection: String,
        /// The colliding guard key.
        key: String,
    },

    /// Stored data did not have the expected shape.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Returns whether this error is a guard-key collision.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_error_display() {
        let err = StoreError::Duplicate {
            collection: "favorites".to_string(),
            key: r#"["favorite","a","b"]"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"Duplicate guard key in favorites: ["favorite","a","b"]"#
        );
        assert!(err.is_duplicate());
    }

    #[test]
    fn lock_error_display() {
        let err = StoreError::Lock("poisoned".to_string());
        assert_eq!(err.to_string(), "Lock error: poisoned");
        assert!(!err.is_duplicate());
    }

    #[test]
    fn invalid_data_error_display() {
        let err = StoreError::InvalidData("body is not an object".to_string());
        assert_eq!(err.to_string(), "Invalid data: body is not an object");
    }

    #[test]
    fn serialization_error_converts() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
