//! Generators for committed transactions and their substate changes.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use vellum_core::{
    CommittedTransaction, EntityAddress, EventKind, IntentHash, LedgerEvent, NewEntity,
    StateVersion, SubstateData, TokenAmount, TransactionStatus, UpsertedSubstate,
};

/// Global counter so generated intent hashes never collide.
static HASH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A unique intent hash.
pub fn intent_hash() -> IntentHash {
    let counter = HASH_COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&counter.to_be_bytes());
    bytes[31] = 0xA1;
    IntentHash::new(bytes)
}

/// A successful transaction at `version` with no changes.
pub fn tx(version: u64) -> CommittedTransaction {
    CommittedTransaction::new(StateVersion::new(version), intent_hash())
}

/// A failed transaction at `version`, paying `fee`.
pub fn failed_tx(version: u64, fee: i64) -> CommittedTransaction {
    let mut tx = tx(version);
    tx.status = TransactionStatus::Failed;
    tx.fee_paid = TokenAmount::from_i64(fee);
    tx
}

/// A transaction creating the given entities.
pub fn creation_tx(version: u64, entities: Vec<NewEntity>) -> CommittedTransaction {
    let mut tx = tx(version);
    tx.created_entities = entities;
    tx
}

/// A metadata upsert; `value: None` is a tombstone.
pub fn metadata_upsert(
    subject: impl Into<EntityAddress>,
    key: &str,
    value: Option<&[u8]>,
) -> UpsertedSubstate {
    UpsertedSubstate::new(
        subject,
        SubstateData::MetadataEntry {
            key: key.to_owned(),
            value: value.map(|v| v.to_vec()),
            is_locked: false,
        },
    )
}

/// An absolute vault-balance upsert.
pub fn balance_upsert(subject: impl Into<EntityAddress>, amount: i64) -> UpsertedSubstate {
    UpsertedSubstate::new(
        subject,
        SubstateData::FungibleVaultBalance {
            amount: TokenAmount::from_i64(amount),
        },
    )
}

/// A mint event emitted by `resource`.
pub fn mint(resource: impl Into<EntityAddress>, amount: i64) -> LedgerEvent {
    LedgerEvent::new(
        resource,
        EventKind::FungibleMinted {
            amount: TokenAmount::from_i64(amount),
        },
    )
}

/// A burn event emitted by `resource`.
pub fn burn(resource: impl Into<EntityAddress>, amount: i64) -> LedgerEvent {
    LedgerEvent::new(
        resource,
        EventKind::FungibleBurned {
            amount: TokenAmount::from_i64(amount),
        },
    )
}

/// A random positive amount up to `max`.
pub fn random_amount(max: i64) -> TokenAmount {
    TokenAmount::from_i64(rand::thread_rng().gen_range(1..=max))
}
