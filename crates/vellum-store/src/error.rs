//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// RocksDB error.
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Requested table is missing from the database.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// A stored row could not be decoded.
    #[error("row deserialization failed: {0}")]
    Deserialization(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
