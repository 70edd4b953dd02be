//! The committed-transaction feed model.

use crate::amount::TokenAmount;
use crate::entities::NewEntity;
use crate::events::LedgerEvent;
use crate::substates::UpsertedSubstate;
use crate::types::{IntentHash, StateVersion};

/// Outcome of a committed transaction. Failed transactions still commit
/// (fees are paid) but carry no substate changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Succeeded,
    Failed,
}

/// One committed transaction as delivered by the core node, already decoded.
///
/// State versions are strictly increasing across a batch; each transaction
/// owns exactly one.
#[derive(Debug, Clone)]
pub struct CommittedTransaction {
    pub state_version: StateVersion,
    pub epoch: u64,
    pub round: u64,
    pub round_timestamp_ms: i64,
    pub intent_hash: IntentHash,
    pub fee_paid: TokenAmount,
    pub status: TransactionStatus,
    pub created_entities: Vec<NewEntity>,
    pub substates: Vec<UpsertedSubstate>,
    pub events: Vec<LedgerEvent>,
}

impl CommittedTransaction {
    /// A successful transaction with no changes; callers fill in the rest.
    pub fn new(state_version: StateVersion, intent_hash: IntentHash) -> Self {
        Self {
            state_version,
            epoch: 0,
            round: 0,
            round_timestamp_ms: 0,
            intent_hash,
            fee_paid: TokenAmount::zero(),
            status: TransactionStatus::Succeeded,
            created_entities: Vec::new(),
            substates: Vec::new(),
            events: Vec::new(),
        }
    }
}
