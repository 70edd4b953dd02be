//! RocksDB database implementation.

use crate::{Store, StoreError, StoreResult, WriteBatch};
use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Tables the engine materializes into, one column family each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Entity address -> entity row (id, type, links).
    Entities,
    /// Row-kind name -> next row id.
    Sequences,
    /// State version -> committed transaction row.
    LedgerTransactions,
    /// Engine bookkeeping (top of ledger).
    LedgerState,
    /// (entity, metadata key digest, version) -> metadata entry row.
    MetadataEntryHistory,
    /// (entity, version) -> metadata aggregate row (MRU entry-id list).
    MetadataAggregateHistory,
    /// (resource, version) -> supply totals row.
    ResourceSupplyHistory,
    /// (vault, version) -> vault balance row.
    VaultBalanceHistory,
    /// (owner, resource) -> current holder row; deleted when balance is zero.
    ResourceHolders,
    /// Default column family (required by RocksDB).
    Default,
}

impl Table {
    /// Get the string name of the table.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Entities => "entities",
            Table::Sequences => "sequences",
            Table::LedgerTransactions => "ledger_transactions",
            Table::LedgerState => "ledger_state",
            Table::MetadataEntryHistory => "metadata_entry_history",
            Table::MetadataAggregateHistory => "metadata_aggregate_history",
            Table::ResourceSupplyHistory => "resource_supply_history",
            Table::VaultBalanceHistory => "vault_balance_history",
            Table::ResourceHolders => "resource_holders",
            Table::Default => "default",
        }
    }

    /// Get all tables.
    pub fn all() -> &'static [Table] {
        &[
            Table::Entities,
            Table::Sequences,
            Table::LedgerTransactions,
            Table::LedgerState,
            Table::MetadataEntryHistory,
            Table::MetadataAggregateHistory,
            Table::ResourceSupplyHistory,
            Table::VaultBalanceHistory,
            Table::ResourceHolders,
            Table::Default,
        ]
    }
}

/// Smallest byte string strictly greater than every key carrying `prefix`.
/// `None` when no such bound exists (prefix is empty or all 0xff).
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Some(upper);
        }
        upper.pop();
    }
    None
}

/// RocksDB database wrapper.
pub struct Database {
    db: Arc<RwLock<DBWithThreadMode<MultiThreaded>>>,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(256);
        opts.set_keep_log_file_num(1);
        opts.set_max_total_wal_size(64 * 1024 * 1024); // 64MB

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = Table::all()
            .iter()
            .map(|table| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                ColumnFamilyDescriptor::new(table.name(), cf_opts)
            })
            .collect();

        let db =
            DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(&opts, path, cf_descriptors)?;

        debug!("Database opened successfully");

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        let db = self.db.read();
        for table in Table::all() {
            if let Some(handle) = db.cf_handle(table.name()) {
                db.flush_cf(&handle)?;
            }
        }
        Ok(())
    }
}

impl Store for Database {
    fn get(&self, table: Table, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let db = self.db.read();
        let handle = db
            .cf_handle(table.name())
            .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))?;

        Ok(db.get_cf(&handle, key)?)
    }

    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let db = self.db.read();
        let handle = db
            .cf_handle(table.name())
            .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))?;

        db.put_cf(&handle, key, value)?;
        Ok(())
    }

    fn delete(&self, table: Table, key: &[u8]) -> StoreResult<()> {
        let db = self.db.read();
        let handle = db
            .cf_handle(table.name())
            .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))?;

        db.delete_cf(&handle, key)?;
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        let db = self.db.read();
        let mut rocks_batch = rocksdb::WriteBatch::default();

        for op in batch.operations {
            let handle = db
                .cf_handle(op.table.name())
                .ok_or_else(|| StoreError::TableNotFound(op.table.name().to_string()))?;

            match op.kind {
                crate::batch::OperationKind::Put { value } => {
                    rocks_batch.put_cf(&handle, &op.key, &value);
                }
                crate::batch::OperationKind::Delete => {
                    rocks_batch.delete_cf(&handle, &op.key);
                }
            }
        }

        db.write(rocks_batch)?;
        Ok(())
    }

    fn iter_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> StoreResult<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>> {
        let db = self.db.read();
        let handle = db
            .cf_handle(table.name())
            .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))?;

        let mode = rocksdb::IteratorMode::From(prefix, rocksdb::Direction::Forward);
        let iter = db.iterator_cf(&handle, mode);

        // Collected up front; history prefixes are narrow (one subject).
        let prefix = prefix.to_vec();
        let collected: Vec<_> = iter
            .filter_map(|r| r.ok())
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect();

        Ok(Box::new(collected.into_iter()))
    }

    fn last_in_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> StoreResult<Option<(Vec<u8>, Vec<u8>)>> {
        let db = self.db.read();
        let handle = db
            .cf_handle(table.name())
            .ok_or_else(|| StoreError::TableNotFound(table.name().to_string()))?;

        let mut iter = db.raw_iterator_cf(&handle);
        match prefix_successor(prefix) {
            Some(upper) => {
                // Lands on the greatest key <= upper; step below the bound
                // itself if it happens to exist.
                iter.seek_for_prev(&upper);
                while iter.valid() && iter.key().map_or(false, |k| k >= upper.as_slice()) {
                    iter.prev();
                }
            }
            None => iter.seek_to_last(),
        }

        if iter.valid() {
            if let (Some(key), Some(value)) = (iter.key(), iter.value()) {
                if key.starts_with(prefix) {
                    return Ok(Some((key.to_vec(), value.to_vec())));
                }
            }
        }
        iter.status()?;
        Ok(None)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}
