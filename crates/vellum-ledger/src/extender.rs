use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use vellum_core::{CommittedTransaction, StateVersion, TransactionStatus};
use vellum_store::rows::{TopOfLedgerRow, TOP_OF_LEDGER_KEY};
use vellum_store::{Store, Table, WriteBatch};

use crate::cancel::CancellationToken;
use crate::error::{LedgerError, LedgerResult};
use crate::processors::{
    MetadataProcessor, Processor, ResourceSupplyProcessor, RowCounts, TransactionProcessor,
    VaultProcessor,
};
use crate::registry::EntityRegistry;
use crate::sequences::SequenceAllocator;
use crate::write;

/// Driver configuration.
#[derive(Debug, Clone, Copy)]
pub struct ExtenderConfig {
    /// Require each batch to start exactly one version after the stored top
    /// of ledger. When off, a gap is logged and accepted.
    pub strict_continuity: bool,
}

impl Default for ExtenderConfig {
    fn default() -> Self {
        Self {
            strict_continuity: true,
        }
    }
}

/// What one committed batch did, for the caller and the logs.
#[derive(Debug, Clone)]
pub struct ExtensionReport {
    pub first_state_version: StateVersion,
    pub last_state_version: StateVersion,
    pub transaction_count: usize,
    pub entities_created: usize,
    pub rows_appended: usize,
    pub rows_deleted: usize,
    pub elapsed: Duration,
}

/// Drives the four-phase pipeline over one batch of committed transactions:
/// observe, load, reconcile, persist.
///
/// Entity resolution runs strictly before observation, so every processor
/// sees resolved subjects. All staged rows commit in one atomic store write
/// together with the sequence counters and the advanced top of ledger;
/// `extend` takes `&mut self`, so batches are sequential by construction. A
/// failed or cancelled batch writes nothing and may burn row ids, which only
/// leaves gaps.
pub struct LedgerExtender {
    store: Arc<dyn Store>,
    sequences: SequenceAllocator,
    config: ExtenderConfig,
    top_of_ledger: Option<StateVersion>,
}

impl LedgerExtender {
    /// Resume over `store`, reloading sequence counters and the top of
    /// ledger persisted by the last committed batch.
    pub fn new(store: Arc<dyn Store>, config: ExtenderConfig) -> LedgerResult<Self> {
        let sequences = SequenceAllocator::load(store.as_ref())?;
        let top_of_ledger = match store.get(Table::LedgerState, TOP_OF_LEDGER_KEY)? {
            Some(value) => Some(TopOfLedgerRow::decode(&value)?.state_version),
            None => None,
        };

        info!(
            top_of_ledger = top_of_ledger.map(StateVersion::number),
            "ledger extender initialized"
        );
        Ok(Self {
            store,
            sequences,
            config,
            top_of_ledger,
        })
    }

    /// The last state version durably committed, if any.
    pub fn top_of_ledger(&self) -> Option<StateVersion> {
        self.top_of_ledger
    }

    /// Materialize one batch of committed transactions.
    #[instrument(skip(self, transactions, token), fields(count = transactions.len()))]
    pub fn extend(
        &mut self,
        transactions: &[CommittedTransaction],
        token: &CancellationToken,
    ) -> LedgerResult<ExtensionReport> {
        let started = Instant::now();
        let (first, last) = self.admit(transactions)?;

        let mut registry = EntityRegistry::new();
        for tx in transactions {
            if tx.status == TransactionStatus::Succeeded {
                registry.scan_transaction(tx)?;
            }
        }
        registry.resolve(self.store.as_ref(), &self.sequences, token)?;

        let mut processors: Vec<Box<dyn Processor>> = vec![
            Box::new(TransactionProcessor::new()),
            Box::new(MetadataProcessor::new()),
            Box::new(ResourceSupplyProcessor::new()),
            Box::new(VaultProcessor::new()),
        ];

        // Observe: the whole batch reaches every processor before any load.
        for tx in transactions {
            for processor in processors.iter_mut() {
                processor.observe_transaction(tx)?;
            }
            if tx.status != TransactionStatus::Succeeded {
                continue;
            }
            for substate in &tx.substates {
                let subject = registry.resolved(&substate.subject)?;
                for processor in processors.iter_mut() {
                    processor.observe_substate(subject, substate, tx.state_version)?;
                }
            }
            for event in &tx.events {
                let emitter = registry.resolved(&event.emitter)?;
                for processor in processors.iter_mut() {
                    processor.observe_event(emitter, &event.kind, tx.state_version)?;
                }
            }
        }

        token.bail_if_cancelled()?;
        for processor in processors.iter_mut() {
            processor.load(self.store.as_ref())?;
        }

        for processor in processors.iter_mut() {
            processor.reconcile(&self.sequences)?;
        }

        let mut batch = WriteBatch::new();
        let entity_rows = registry.created_rows()?;
        let mut counts = RowCounts {
            appended: write::append_entity_rows(&mut batch, &entity_rows),
            deleted: 0,
        };
        for processor in processors.iter_mut() {
            let staged = processor.persist(&mut batch)?;
            debug!(
                processor = processor.name(),
                appended = staged.appended,
                deleted = staged.deleted,
                "processor staged rows"
            );
            counts.merge(staged);
        }

        let top = TopOfLedgerRow {
            state_version: last,
        };
        batch.put(Table::LedgerState, TOP_OF_LEDGER_KEY.to_vec(), top.encode());
        self.sequences.stage(&mut batch);

        token.bail_if_cancelled()?;
        self.store.write_batch(batch)?;
        self.top_of_ledger = Some(last);

        let report = ExtensionReport {
            first_state_version: first,
            last_state_version: last,
            transaction_count: transactions.len(),
            entities_created: registry.created_count(),
            rows_appended: counts.appended,
            rows_deleted: counts.deleted,
            elapsed: started.elapsed(),
        };
        info!(
            first = %report.first_state_version,
            last = %report.last_state_version,
            transactions = report.transaction_count,
            entities_created = report.entities_created,
            rows_appended = report.rows_appended,
            rows_deleted = report.rows_deleted,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch committed"
        );
        Ok(report)
    }

    /// Validate batch shape against the stored top of ledger. Returns the
    /// batch's first and last state versions.
    fn admit(
        &self,
        transactions: &[CommittedTransaction],
    ) -> LedgerResult<(StateVersion, StateVersion)> {
        let first = transactions
            .first()
            .ok_or(LedgerError::EmptyBatch)?
            .state_version;
        let last = transactions
            .last()
            .map(|tx| tx.state_version)
            .unwrap_or(first);

        for pair in transactions.windows(2) {
            if pair[1].state_version <= pair[0].state_version {
                return Err(LedgerError::NonMonotonicBatch {
                    previous: pair[0].state_version,
                    current: pair[1].state_version,
                });
            }
        }

        let top = self.top_of_ledger.unwrap_or(StateVersion::PRE_GENESIS);
        if first <= top {
            return Err(LedgerError::BatchBehindTopOfLedger { top, first });
        }
        if first != top.next() {
            if self.config.strict_continuity {
                return Err(LedgerError::BatchNotContiguous { top, first });
            }
            warn!(%top, %first, "accepting batch despite gap after top of ledger");
        }
        Ok((first, last))
    }
}
