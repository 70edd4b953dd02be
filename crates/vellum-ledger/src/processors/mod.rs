//! Per-concern processors and the lifecycle protocol the driver runs them
//! through.
//!
//! Every processor follows the same four phases for one batch:
//! observe (collect changes, no I/O), load (bulk-fetch the most recent
//! materialized rows for everything observed), reconcile (pure in-memory,
//! never suspends), persist (stage rows into the batch's atomic write set).
//! A processor instance lives for exactly one batch.

mod metadata;
mod supply;
mod transactions;
mod vault;

pub use metadata::MetadataProcessor;
pub use supply::ResourceSupplyProcessor;
pub use transactions::TransactionProcessor;
pub use vault::VaultProcessor;

use vellum_core::{CommittedTransaction, EventKind, StateVersion, UpsertedSubstate};
use vellum_store::{Store, WriteBatch};

use crate::error::LedgerResult;
use crate::registry::ResolvedEntity;
use crate::sequences::SequenceAllocator;

/// Rows a processor staged for persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    /// History rows appended and current rows upserted.
    pub appended: usize,
    /// Current rows deleted (empty-sentinel values).
    pub deleted: usize,
}

impl RowCounts {
    pub fn merge(&mut self, other: RowCounts) {
        self.appended += other.appended;
        self.deleted += other.deleted;
    }
}

/// One concern's slice of the batch pipeline.
///
/// Observation callbacks receive already-resolved subjects; a processor
/// pattern-matches the payload variants it tracks and leaves the default
/// no-op for everything else, so new feed shapes never break it.
pub trait Processor {
    fn name(&self) -> &'static str;

    /// Called once per committed transaction, before its substates.
    fn observe_transaction(&mut self, _tx: &CommittedTransaction) -> LedgerResult<()> {
        Ok(())
    }

    /// Called for every substate upsert of a successful transaction.
    fn observe_substate(
        &mut self,
        _subject: &ResolvedEntity,
        _substate: &UpsertedSubstate,
        _version: StateVersion,
    ) -> LedgerResult<()> {
        Ok(())
    }

    /// Called for every ledger event of a successful transaction.
    fn observe_event(
        &mut self,
        _emitter: &ResolvedEntity,
        _kind: &EventKind,
        _version: StateVersion,
    ) -> LedgerResult<()> {
        Ok(())
    }

    /// Bulk-load the most recent materialized rows for the observed subjects.
    /// The only phase that reads the store.
    fn load(&mut self, _store: &dyn Store) -> LedgerResult<()> {
        Ok(())
    }

    /// Replay the grouped observations against the loaded rows and build the
    /// rows this batch will persist. In-memory only.
    fn reconcile(&mut self, _sequences: &SequenceAllocator) -> LedgerResult<()> {
        Ok(())
    }

    /// Stage every built row into `batch`.
    fn persist(&mut self, batch: &mut WriteBatch) -> LedgerResult<RowCounts>;
}
