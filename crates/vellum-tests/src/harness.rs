//! Test harness: a temporary store behind a ready-to-use extender, plus
//! typed readers over the materialized tables.

use std::sync::Arc;

use tempfile::TempDir;
use vellum_core::{CommittedTransaction, EntityId};
use vellum_ledger::{
    CancellationToken, ExtenderConfig, ExtensionReport, LedgerExtender, LedgerResult,
};
use vellum_store::rows::{
    CurrentRow, EntityRow, HistoryRow, MetadataAggregateRow, MetadataEntryRow, ResourceHolderRow,
    ResourceSupplyRow, TransactionRow, VaultBalanceRow,
};
use vellum_store::{Database, Store, Table};

/// An extender over a store in a temporary directory, cleaned up on drop.
pub struct TestLedger {
    store: Arc<Database>,
    extender: LedgerExtender,
    _temp_dir: TempDir,
}

impl TestLedger {
    pub fn new() -> Self {
        Self::with_config(ExtenderConfig::default())
    }

    pub fn with_config(config: ExtenderConfig) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store = Arc::new(Database::open(temp_dir.path()).expect("failed to open store"));
        let extender = LedgerExtender::new(Arc::clone(&store) as Arc<dyn Store>, config)
            .expect("failed to initialize extender");
        Self {
            store,
            extender,
            _temp_dir: temp_dir,
        }
    }

    /// Run one batch with a fresh cancellation token.
    pub fn extend(
        &mut self,
        transactions: &[CommittedTransaction],
    ) -> LedgerResult<ExtensionReport> {
        self.extender
            .extend(transactions, &CancellationToken::new())
    }

    pub fn extender(&mut self) -> &mut LedgerExtender {
        &mut self.extender
    }

    pub fn store(&self) -> &Database {
        &self.store
    }

    /// Reopen the extender over the same store, as a process restart would.
    pub fn restart(&mut self, config: ExtenderConfig) {
        self.extender = LedgerExtender::new(Arc::clone(&self.store) as Arc<dyn Store>, config)
            .expect("failed to reopen extender");
    }

    pub fn entity(&self, address: &str) -> Option<EntityRow> {
        self.store
            .get(Table::Entities, address.as_bytes())
            .expect("store read failed")
            .map(|value| EntityRow::decode(&value).expect("corrupt entity row"))
    }

    /// Internal id of an already-persisted entity.
    pub fn entity_id(&self, address: &str) -> EntityId {
        self.entity(address)
            .unwrap_or_else(|| panic!("entity {address} not persisted"))
            .id
    }

    fn history<R: HistoryRow>(&self, prefix: &[u8]) -> Vec<R> {
        self.store
            .iter_prefix(R::TABLE, prefix)
            .expect("store scan failed")
            .map(|(_, value)| R::decode(&value).expect("corrupt history row"))
            .collect()
    }

    /// Entry history of one metadata key, oldest first.
    pub fn metadata_entries(&self, entity: EntityId, key: &str) -> Vec<MetadataEntryRow> {
        self.history(&MetadataEntryRow::subject_prefix(entity, key))
    }

    /// Aggregate history of one entity's metadata, oldest first.
    pub fn metadata_aggregates(&self, entity: EntityId) -> Vec<MetadataAggregateRow> {
        self.history(&MetadataAggregateRow::subject_prefix(entity))
    }

    /// Every metadata entry row of one entity, any key, oldest first per key.
    pub fn all_metadata_entries(&self, entity: EntityId) -> Vec<MetadataEntryRow> {
        self.history(&entity.to_be_bytes())
    }

    pub fn supply_history(&self, resource: EntityId) -> Vec<ResourceSupplyRow> {
        self.history(&ResourceSupplyRow::subject_prefix(resource))
    }

    pub fn vault_history(&self, vault: EntityId) -> Vec<VaultBalanceRow> {
        self.history(&VaultBalanceRow::subject_prefix(vault))
    }

    pub fn transaction_rows(&self) -> Vec<TransactionRow> {
        self.history(&[])
    }

    pub fn holder(&self, owner: EntityId, resource: EntityId) -> Option<ResourceHolderRow> {
        self.store
            .get(
                Table::ResourceHolders,
                &ResourceHolderRow::storage_key(owner, resource),
            )
            .expect("store read failed")
            .map(|value| ResourceHolderRow::decode(&value).expect("corrupt holder row"))
    }
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}
