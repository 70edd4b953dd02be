//! Committed transaction rows.

use super::codec::{read_amount, read_i64, read_u64, read_u8, take, write_amount};
use super::HistoryRow;
use crate::{StoreError, StoreResult, Table};
use vellum_core::{IntentHash, StateVersion, TokenAmount, TransactionStatus};

/// One committed transaction, keyed by state version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRow {
    pub state_version: StateVersion,
    pub epoch: u64,
    pub round: u64,
    pub round_timestamp_ms: i64,
    pub intent_hash: IntentHash,
    pub fee_paid: TokenAmount,
    pub status: TransactionStatus,
}

impl HistoryRow for TransactionRow {
    const TABLE: Table = Table::LedgerTransactions;

    fn key(&self) -> Vec<u8> {
        self.state_version.to_be_bytes().to_vec()
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.state_version.to_be_bytes());
        buf.extend_from_slice(&self.epoch.to_be_bytes());
        buf.extend_from_slice(&self.round.to_be_bytes());
        buf.extend_from_slice(&self.round_timestamp_ms.to_be_bytes());
        buf.extend_from_slice(self.intent_hash.as_bytes());
        write_amount(&mut buf, &self.fee_paid);
        buf.push(status_tag(self.status));
        buf
    }

    fn decode(value: &[u8]) -> StoreResult<Self> {
        let mut data = value;
        let state_version = StateVersion::new(read_u64(&mut data, "transaction.version")?);
        let epoch = read_u64(&mut data, "transaction.epoch")?;
        let round = read_u64(&mut data, "transaction.round")?;
        let round_timestamp_ms = read_i64(&mut data, "transaction.timestamp")?;
        let hash_bytes = take(&mut data, 32, "transaction.intent_hash")?;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(hash_bytes);
        let fee_paid = read_amount(&mut data, "transaction.fee")?;
        let status = status_from_tag(read_u8(&mut data, "transaction.status")?)?;

        Ok(Self {
            state_version,
            epoch,
            round,
            round_timestamp_ms,
            intent_hash: IntentHash::new(hash),
            fee_paid,
            status,
        })
    }
}

fn status_tag(status: TransactionStatus) -> u8 {
    match status {
        TransactionStatus::Succeeded => 0,
        TransactionStatus::Failed => 1,
    }
}

fn status_from_tag(tag: u8) -> StoreResult<TransactionStatus> {
    match tag {
        0 => Ok(TransactionStatus::Succeeded),
        1 => Ok(TransactionStatus::Failed),
        other => Err(StoreError::Deserialization(format!(
            "transaction.status: unknown tag {other}"
        ))),
    }
}
