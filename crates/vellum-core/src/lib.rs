//! # vellum-core
//!
//! Domain model for the vellum ledger-extension engine.
//!
//! This crate provides:
//! - Identity newtypes (`StateVersion`, `EntityId`, `EntityAddress`,
//!   `IntentHash`)
//! - Arbitrary-precision token amounts
//! - The decoded feed model: committed transactions, substate upserts,
//!   ledger events, and entity declarations
//!
//! Nothing here touches storage or the engine; these are the plain values
//! the ingestion pipeline hands to `vellum-ledger` once per batch.

mod amount;
mod entities;
mod events;
mod substates;
mod transactions;
mod types;

pub use amount::{AmountParseError, TokenAmount};
pub use entities::{EntityType, NewEntity};
pub use events::{EventKind, LedgerEvent};
pub use substates::{SubstateData, UpsertedSubstate};
pub use transactions::{CommittedTransaction, TransactionStatus};
pub use types::{EntityAddress, EntityId, IntentHash, StateVersion};
