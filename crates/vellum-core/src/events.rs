//! Transaction-level ledger events.

use crate::amount::TokenAmount;
use crate::types::EntityAddress;

/// The decoded payload of one ledger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// New supply of the emitting resource was created.
    FungibleMinted { amount: TokenAmount },
    /// Supply of the emitting resource was destroyed.
    FungibleBurned { amount: TokenAmount },
    /// Tokens entered the emitting vault. Not currently materialized.
    FungibleDeposited { amount: TokenAmount },
    /// Tokens left the emitting vault. Not currently materialized.
    FungibleWithdrawn { amount: TokenAmount },
}

impl EventKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            EventKind::FungibleMinted { .. } => "fungible_minted",
            EventKind::FungibleBurned { .. } => "fungible_burned",
            EventKind::FungibleDeposited { .. } => "fungible_deposited",
            EventKind::FungibleWithdrawn { .. } => "fungible_withdrawn",
        }
    }
}

/// An event emitted while executing a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEvent {
    pub emitter: EntityAddress,
    pub kind: EventKind,
}

impl LedgerEvent {
    pub fn new(emitter: impl Into<EntityAddress>, kind: EventKind) -> Self {
        Self {
            emitter: emitter.into(),
            kind,
        }
    }
}
