use std::sync::atomic::{AtomicU64, Ordering};

use vellum_store::{Store, StoreError, Table, WriteBatch};

use crate::error::LedgerResult;

/// Row families with independently allocated ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    Entity,
    MetadataEntry,
    MetadataAggregate,
    ResourceSupply,
    VaultBalance,
}

const KIND_COUNT: usize = 5;

impl SequenceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SequenceKind::Entity => "entity",
            SequenceKind::MetadataEntry => "metadata_entry",
            SequenceKind::MetadataAggregate => "metadata_aggregate",
            SequenceKind::ResourceSupply => "resource_supply",
            SequenceKind::VaultBalance => "vault_balance",
        }
    }

    pub fn all() -> &'static [SequenceKind] {
        &[
            SequenceKind::Entity,
            SequenceKind::MetadataEntry,
            SequenceKind::MetadataAggregate,
            SequenceKind::ResourceSupply,
            SequenceKind::VaultBalance,
        ]
    }

    fn index(self) -> usize {
        match self {
            SequenceKind::Entity => 0,
            SequenceKind::MetadataEntry => 1,
            SequenceKind::MetadataAggregate => 2,
            SequenceKind::ResourceSupply => 3,
            SequenceKind::VaultBalance => 4,
        }
    }
}

/// Monotonic id allocator for every row family.
///
/// Ids are handed out in memory during reconciliation so rows can reference
/// each other before anything is persisted. The counters are staged into
/// every batch and reloaded on startup; ids burned by a failed batch are
/// never reused, leaving gaps, which is harmless.
#[derive(Debug)]
pub struct SequenceAllocator {
    counters: [AtomicU64; KIND_COUNT],
}

impl SequenceAllocator {
    /// All counters at zero, for a fresh database.
    pub fn new() -> Self {
        Self {
            counters: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Resume from the counters persisted with the last committed batch.
    pub fn load(store: &dyn Store) -> LedgerResult<Self> {
        let allocator = Self::new();
        for kind in SequenceKind::all() {
            if let Some(value) = store.get(Table::Sequences, kind.name().as_bytes())? {
                let bytes: [u8; 8] = value.as_slice().try_into().map_err(|_| {
                    StoreError::Deserialization(format!(
                        "sequence {}: expected 8 bytes, got {}",
                        kind.name(),
                        value.len()
                    ))
                })?;
                allocator.counters[kind.index()].store(u64::from_be_bytes(bytes), Ordering::SeqCst);
            }
        }
        Ok(allocator)
    }

    /// Allocate the next id for `kind`. The first id issued is 1.
    pub fn next(&self, kind: SequenceKind) -> u64 {
        self.counters[kind.index()].fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last id issued for `kind`, zero if none.
    pub fn current(&self, kind: SequenceKind) -> u64 {
        self.counters[kind.index()].load(Ordering::SeqCst)
    }

    /// Stage every counter into `batch` so allocation state commits with the
    /// rows that consumed it.
    pub fn stage(&self, batch: &mut WriteBatch) {
        for kind in SequenceKind::all() {
            batch.put(
                Table::Sequences,
                kind.name().as_bytes().to_vec(),
                self.current(*kind).to_be_bytes().to_vec(),
            );
        }
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}
