use std::collections::HashSet;

use vellum_core::{EntityId, StateVersion, SubstateData, TokenAmount, UpsertedSubstate};
use vellum_store::rows::{ResourceHolderRow, VaultBalanceRow};
use vellum_store::{Store, WriteBatch};

use crate::cache::MostRecentCache;
use crate::error::{LedgerError, LedgerResult};
use crate::processors::{Processor, RowCounts};
use crate::registry::ResolvedEntity;
use crate::sequences::{SequenceAllocator, SequenceKind};
use crate::tracker::ChangeTracker;
use crate::{read, write};

#[derive(Debug)]
struct VaultChange {
    owner: EntityId,
    resource: EntityId,
    /// Absolute balance after the change.
    balance: TokenAmount,
    /// Balance before the change, when the feed knows it.
    previous: Option<TokenAmount>,
}

/// Vault balances: append-only history per vault, plus a mutable
/// `(owner, resource)` holders side table aggregated from balance deltas.
///
/// The side table skips the aggregate layer entirely: rows are upserted in
/// place and deleted outright once an owner's total for a resource reaches
/// zero, so it always reads as "current holders".
pub struct VaultProcessor {
    tracker: ChangeTracker<(EntityId, StateVersion), Vec<VaultChange>>,
    most_recent_balances: MostRecentCache<EntityId, VaultBalanceRow>,
    current_holders: MostRecentCache<(EntityId, EntityId), ResourceHolderRow>,
    pending_balances: Vec<VaultBalanceRow>,
    /// Final holder rows, in first-touch order for deterministic staging.
    pending_holders: ChangeTracker<(EntityId, EntityId), ResourceHolderRow>,
}

impl VaultProcessor {
    pub fn new() -> Self {
        Self {
            tracker: ChangeTracker::new(),
            most_recent_balances: MostRecentCache::new(),
            current_holders: MostRecentCache::new(),
            pending_balances: Vec::new(),
            pending_holders: ChangeTracker::new(),
        }
    }
}

impl Default for VaultProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for VaultProcessor {
    fn name(&self) -> &'static str {
        "vault_balances"
    }

    fn observe_substate(
        &mut self,
        subject: &ResolvedEntity,
        substate: &UpsertedSubstate,
        version: StateVersion,
    ) -> LedgerResult<()> {
        let SubstateData::FungibleVaultBalance { amount } = &substate.data else {
            return Ok(());
        };
        if !subject.is_vault() {
            return Err(LedgerError::EntityTypeMismatch {
                address: subject.address.clone(),
                expected: vellum_core::EntityType::FungibleVault.name(),
                actual: subject.entity_type.name(),
            });
        }

        let previous = substate.previous.as_ref().and_then(|data| match data {
            SubstateData::FungibleVaultBalance { amount } => Some(amount.clone()),
            _ => None,
        });
        self.tracker
            .get_or_add((subject.id, version), Vec::new)
            .push(VaultChange {
                owner: subject.vault_owner()?,
                resource: subject.vault_resource()?,
                balance: amount.clone(),
                previous,
            });
        Ok(())
    }

    fn load(&mut self, store: &dyn Store) -> LedgerResult<()> {
        let mut vaults: HashSet<EntityId> = HashSet::new();
        let mut holder_keys: HashSet<(EntityId, EntityId)> = HashSet::new();
        for ((vault, _), changes) in self.tracker.entries() {
            vaults.insert(*vault);
            for change in changes {
                holder_keys.insert((change.owner, change.resource));
            }
        }

        self.most_recent_balances
            .populate(read::load_most_recent(store, vaults, |vault| {
                VaultBalanceRow::subject_prefix(*vault)
            })?);
        self.current_holders
            .populate(read::load_current(store, holder_keys, |(owner, resource)| {
                ResourceHolderRow::storage_key(*owner, *resource)
            })?);
        Ok(())
    }

    fn reconcile(&mut self, sequences: &SequenceAllocator) -> LedgerResult<()> {
        let tracker = std::mem::take(&mut self.tracker);
        for ((vault, version), changes) in tracker.entries() {
            for change in changes {
                if let Some(previous) = self.most_recent_balances.try_get(vault) {
                    if previous.from_state_version > *version {
                        return Err(LedgerError::OutOfOrderObservation {
                            subject: format!("balance of vault {vault}"),
                            observed: *version,
                            materialized: previous.from_state_version,
                        });
                    }
                }

                let previous_balance = change
                    .previous
                    .clone()
                    .or_else(|| {
                        self.most_recent_balances
                            .try_get(vault)
                            .map(|row| row.balance.clone())
                    })
                    .unwrap_or_else(TokenAmount::zero);
                let delta = &change.balance - &previous_balance;

                let row = VaultBalanceRow {
                    id: sequences.next(SequenceKind::VaultBalance),
                    from_state_version: *version,
                    vault_entity_id: *vault,
                    owner_entity_id: change.owner,
                    resource_entity_id: change.resource,
                    balance: change.balance.clone(),
                };
                self.most_recent_balances.insert(*vault, row.clone());
                self.pending_balances.push(row);

                let current_holders = &self.current_holders;
                let holder = self
                    .pending_holders
                    .get_or_add((change.owner, change.resource), || {
                        current_holders.cloned_or_else(
                            &(change.owner, change.resource),
                            || ResourceHolderRow {
                                owner_entity_id: change.owner,
                                resource_entity_id: change.resource,
                                balance: TokenAmount::zero(),
                                last_updated_at: *version,
                            },
                        )
                    });
                holder.balance += &delta;
                holder.last_updated_at = *version;
            }
        }
        Ok(())
    }

    fn persist(&mut self, batch: &mut WriteBatch) -> LedgerResult<RowCounts> {
        let appended = write::append_rows(batch, &self.pending_balances);
        let (written, deleted) =
            write::upsert_or_delete(batch, self.pending_holders.entries().map(|(_, row)| row));
        Ok(RowCounts {
            appended: appended + written,
            deleted,
        })
    }
}
