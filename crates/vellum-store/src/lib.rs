//! # vellum-store
//!
//! Durable storage for the vellum ledger-extension engine.
//!
//! This crate provides:
//! - The `Store` trait: point lookups, prefix iteration, latest-row-per-prefix
//!   seeks, and atomic write batches
//! - A RocksDB-backed implementation (`Database`)
//! - The table set and hand-rolled row codecs for every materialized table
//!
//! History tables key rows as `subject prefix ++ from_state_version` in
//! big-endian, so "the most recent row for a subject" is one reverse seek and
//! a batch's appends stay ordered.

mod batch;
mod database;
mod error;
pub mod rows;

pub use batch::{BatchOperation, OperationKind, WriteBatch};
pub use database::{Database, Table};
pub use error::{StoreError, StoreResult};

/// Storage interface for the engine.
///
/// Implementations must be thread-safe. `multi_get` and
/// `multi_last_in_prefix` are the set-based load surface: one call per key
/// set, never one call per key at the call site.
pub trait Store: Send + Sync {
    /// Get a value by key.
    fn get(&self, table: Table, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Put a key-value pair.
    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Delete a key.
    fn delete(&self, table: Table, key: &[u8]) -> StoreResult<()>;

    /// Check if a key exists.
    fn contains(&self, table: Table, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(table, key)?.is_some())
    }

    /// Apply a batch of writes atomically.
    fn write_batch(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Iterate over all key-value pairs under a prefix, in key order.
    fn iter_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> StoreResult<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>>;

    /// The greatest key under a prefix and its value, if any.
    ///
    /// With version-suffixed history keys this is "the most recent row for
    /// the subject the prefix identifies".
    fn last_in_prefix(&self, table: Table, prefix: &[u8]) -> StoreResult<Option<(Vec<u8>, Vec<u8>)>>;

    /// Get multiple values in one call.
    fn multi_get(&self, table: Table, keys: &[&[u8]]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.get(table, key)).collect()
    }

    /// `last_in_prefix` for a whole set of prefixes in one call.
    fn multi_last_in_prefix(
        &self,
        table: Table,
        prefixes: &[&[u8]],
    ) -> StoreResult<Vec<Option<(Vec<u8>, Vec<u8>)>>> {
        prefixes
            .iter()
            .map(|prefix| self.last_in_prefix(table, prefix))
            .collect()
    }
}
