//! Decoded substate payloads.
//!
//! A substate is the finest-grained unit of ledger state. The feed delivers
//! them already decoded as a closed sum type; processors pattern-match the
//! variants they track and ignore everything else, so new variants never
//! break existing processors.

use crate::amount::TokenAmount;
use crate::types::EntityAddress;

/// The decoded payload of one substate upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstateData {
    /// One metadata key of an entity. `value: None` is a tombstone: the key
    /// was removed at this version.
    MetadataEntry {
        key: String,
        value: Option<Vec<u8>>,
        is_locked: bool,
    },
    /// The absolute balance of a fungible vault after this version.
    FungibleVaultBalance { amount: TokenAmount },
    /// Access-rule assignment. Carried by the feed; no processor currently
    /// materializes it.
    RoleAssignmentEntry { role_key: String, rule: Vec<u8> },
}

impl SubstateData {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SubstateData::MetadataEntry { .. } => "metadata_entry",
            SubstateData::FungibleVaultBalance { .. } => "fungible_vault_balance",
            SubstateData::RoleAssignmentEntry { .. } => "role_assignment_entry",
        }
    }
}

/// One substate change observed at one state version.
///
/// `previous` carries the value the substate held before this transaction,
/// when the feed knows it; delta-based processors fall back to their loaded
/// most-recent row when it is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertedSubstate {
    pub subject: EntityAddress,
    pub data: SubstateData,
    pub previous: Option<SubstateData>,
}

impl UpsertedSubstate {
    pub fn new(subject: impl Into<EntityAddress>, data: SubstateData) -> Self {
        Self {
            subject: subject.into(),
            data,
            previous: None,
        }
    }

    pub fn with_previous(mut self, previous: SubstateData) -> Self {
        self.previous = Some(previous);
        self
    }
}
