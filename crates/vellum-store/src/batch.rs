//! Write batch for atomic multi-table operations.
//!
//! One ledger batch stages every row it produces into a single `WriteBatch`;
//! the one `Store::write_batch` call at the end is the all-or-nothing commit
//! boundary.

use crate::database::Table;

/// A single operation in a write batch.
#[derive(Debug, Clone)]
pub struct BatchOperation {
    /// Target table.
    pub table: Table,
    /// Key to operate on.
    pub key: Vec<u8>,
    /// Operation kind.
    pub kind: OperationKind,
}

/// The kind of batch operation.
#[derive(Debug, Clone)]
pub enum OperationKind {
    /// Put a key-value pair.
    Put { value: Vec<u8> },
    /// Delete a key.
    Delete,
}

/// A batch of write operations applied atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    /// Operations in order.
    pub operations: Vec<BatchOperation>,
}

impl WriteBatch {
    /// Create a new empty write batch.
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Add a put operation.
    pub fn put(&mut self, table: Table, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.operations.push(BatchOperation {
            table,
            key: key.into(),
            kind: OperationKind::Put {
                value: value.into(),
            },
        });
    }

    /// Add a delete operation.
    pub fn delete(&mut self, table: Table, key: impl Into<Vec<u8>>) {
        self.operations.push(BatchOperation {
            table,
            key: key.into(),
            kind: OperationKind::Delete,
        });
    }

    /// Number of operations in the batch.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
