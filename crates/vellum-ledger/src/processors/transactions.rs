use vellum_core::CommittedTransaction;
use vellum_store::rows::TransactionRow;
use vellum_store::WriteBatch;

use crate::error::LedgerResult;
use crate::processors::{Processor, RowCounts};
use crate::write;

/// Appends one ledger-transaction row per committed transaction, failed ones
/// included (they commit and pay fees). No reconciliation: the feed is the
/// value.
#[derive(Debug, Default)]
pub struct TransactionProcessor {
    pending: Vec<TransactionRow>,
}

impl TransactionProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Processor for TransactionProcessor {
    fn name(&self) -> &'static str {
        "transactions"
    }

    fn observe_transaction(&mut self, tx: &CommittedTransaction) -> LedgerResult<()> {
        self.pending.push(TransactionRow {
            state_version: tx.state_version,
            epoch: tx.epoch,
            round: tx.round,
            round_timestamp_ms: tx.round_timestamp_ms,
            intent_hash: tx.intent_hash,
            fee_paid: tx.fee_paid.clone(),
            status: tx.status,
        });
        Ok(())
    }

    fn persist(&mut self, batch: &mut WriteBatch) -> LedgerResult<RowCounts> {
        Ok(RowCounts {
            appended: write::append_rows(batch, &self.pending),
            deleted: 0,
        })
    }
}
