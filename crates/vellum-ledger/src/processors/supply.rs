use std::collections::{HashMap, HashSet};

use vellum_core::{EntityId, EntityType, EventKind, StateVersion, TokenAmount};
use vellum_store::rows::ResourceSupplyRow;
use vellum_store::{Store, WriteBatch};

use crate::cache::MostRecentCache;
use crate::error::{LedgerError, LedgerResult};
use crate::processors::{Processor, RowCounts};
use crate::registry::ResolvedEntity;
use crate::sequences::{SequenceAllocator, SequenceKind};
use crate::tracker::ChangeTracker;
use crate::{read, write};

#[derive(Debug)]
enum SupplyChange {
    Minted(TokenAmount),
    Burned(TokenAmount),
}

/// The running-totals variant of the reconciler, over mint and burn events.
///
/// One totals row per `(resource, state version)`: the previous row's
/// counters are cloned forward, then every event at that version adjusts
/// them, so each row is a self-sufficient snapshot.
pub struct ResourceSupplyProcessor {
    tracker: ChangeTracker<(EntityId, StateVersion), Vec<SupplyChange>>,
    most_recent: MostRecentCache<EntityId, ResourceSupplyRow>,
    pending: Vec<ResourceSupplyRow>,
    pending_index: HashMap<EntityId, usize>,
}

impl ResourceSupplyProcessor {
    pub fn new() -> Self {
        Self {
            tracker: ChangeTracker::new(),
            most_recent: MostRecentCache::new(),
            pending: Vec::new(),
            pending_index: HashMap::new(),
        }
    }

    fn pending_row_at(
        &mut self,
        resource: EntityId,
        version: StateVersion,
        sequences: &SequenceAllocator,
    ) -> LedgerResult<usize> {
        if let Some(&idx) = self.pending_index.get(&resource) {
            if self.pending[idx].from_state_version == version {
                return Ok(idx);
            }
        }

        let mut next = match self.pending_index.get(&resource) {
            Some(&idx) => self.pending[idx].clone(),
            None => {
                if let Some(previous) = self.most_recent.try_get(&resource) {
                    if previous.from_state_version > version {
                        return Err(LedgerError::OutOfOrderObservation {
                            subject: format!("supply of resource {resource}"),
                            observed: version,
                            materialized: previous.from_state_version,
                        });
                    }
                }
                self.most_recent
                    .cloned_or_else(&resource, || ResourceSupplyRow {
                        id: 0,
                        from_state_version: version,
                        resource_entity_id: resource,
                        total_supply: TokenAmount::zero(),
                        total_minted: TokenAmount::zero(),
                        total_burned: TokenAmount::zero(),
                    })
            }
        };
        next.id = sequences.next(SequenceKind::ResourceSupply);
        next.from_state_version = version;

        self.pending.push(next);
        let idx = self.pending.len() - 1;
        self.pending_index.insert(resource, idx);
        Ok(idx)
    }
}

impl Default for ResourceSupplyProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for ResourceSupplyProcessor {
    fn name(&self) -> &'static str {
        "resource_supply"
    }

    fn observe_event(
        &mut self,
        emitter: &ResolvedEntity,
        kind: &EventKind,
        version: StateVersion,
    ) -> LedgerResult<()> {
        let change = match kind {
            EventKind::FungibleMinted { amount } => SupplyChange::Minted(amount.clone()),
            EventKind::FungibleBurned { amount } => SupplyChange::Burned(amount.clone()),
            _ => return Ok(()),
        };
        if emitter.entity_type != EntityType::FungibleResource {
            return Err(LedgerError::EntityTypeMismatch {
                address: emitter.address.clone(),
                expected: EntityType::FungibleResource.name(),
                actual: emitter.entity_type.name(),
            });
        }

        self.tracker
            .get_or_add((emitter.id, version), Vec::new)
            .push(change);
        Ok(())
    }

    fn load(&mut self, store: &dyn Store) -> LedgerResult<()> {
        let resources: HashSet<EntityId> = self
            .tracker
            .keys()
            .map(|(resource, _)| *resource)
            .collect();
        self.most_recent
            .populate(read::load_most_recent(store, resources, |resource| {
                ResourceSupplyRow::subject_prefix(*resource)
            })?);
        Ok(())
    }

    fn reconcile(&mut self, sequences: &SequenceAllocator) -> LedgerResult<()> {
        let tracker = std::mem::take(&mut self.tracker);
        for ((resource, version), changes) in tracker.entries() {
            let idx = self.pending_row_at(*resource, *version, sequences)?;
            let row = &mut self.pending[idx];
            for change in changes {
                match change {
                    SupplyChange::Minted(amount) => {
                        row.total_minted += amount;
                        row.total_supply += amount;
                    }
                    SupplyChange::Burned(amount) => {
                        row.total_burned += amount;
                        row.total_supply -= amount;
                    }
                }
            }
        }
        Ok(())
    }

    fn persist(&mut self, batch: &mut WriteBatch) -> LedgerResult<RowCounts> {
        Ok(RowCounts {
            appended: write::append_rows(batch, &self.pending),
            deleted: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vellum_core::EntityAddress;
    use vellum_store::Database;

    fn resource(id: u64) -> ResolvedEntity {
        ResolvedEntity {
            id: EntityId::new(id),
            address: EntityAddress::new(format!("resource_{id}")),
            entity_type: EntityType::FungibleResource,
            parent_id: None,
            fungible_resource_id: None,
            from_state_version: StateVersion::new(1),
        }
    }

    fn run(processor: &mut ResourceSupplyProcessor, store: &Database) -> Vec<ResourceSupplyRow> {
        let sequences = SequenceAllocator::load(store).unwrap();
        processor.load(store).unwrap();
        processor.reconcile(&sequences).unwrap();

        let mut batch = WriteBatch::new();
        processor.persist(&mut batch).unwrap();
        sequences.stage(&mut batch);
        store.write_batch(batch).unwrap();

        processor.pending.clone()
    }

    #[test]
    fn mint_then_burn_snapshots_all_three_counters() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut processor = ResourceSupplyProcessor::new();
        processor
            .observe_event(
                &resource(1),
                &EventKind::FungibleMinted {
                    amount: TokenAmount::from_i64(5),
                },
                StateVersion::new(10),
            )
            .unwrap();
        processor
            .observe_event(
                &resource(1),
                &EventKind::FungibleBurned {
                    amount: TokenAmount::from_i64(2),
                },
                StateVersion::new(20),
            )
            .unwrap();

        let rows = run(&mut processor, &store);
        assert_eq!(rows.len(), 2);

        // Intermediate snapshot after the mint.
        assert_eq!(rows[0].from_state_version, StateVersion::new(10));
        assert_eq!(rows[0].total_supply, TokenAmount::from_i64(5));

        assert_eq!(rows[1].from_state_version, StateVersion::new(20));
        assert_eq!(rows[1].total_minted, TokenAmount::from_i64(5));
        assert_eq!(rows[1].total_burned, TokenAmount::from_i64(2));
        assert_eq!(rows[1].total_supply, TokenAmount::from_i64(3));
    }

    #[test]
    fn events_at_one_version_share_one_row() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut processor = ResourceSupplyProcessor::new();
        for amount in [3i64, 4] {
            processor
                .observe_event(
                    &resource(1),
                    &EventKind::FungibleMinted {
                        amount: TokenAmount::from_i64(amount),
                    },
                    StateVersion::new(10),
                )
                .unwrap();
        }

        let rows = run(&mut processor, &store);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_supply, TokenAmount::from_i64(7));
    }

    #[test]
    fn totals_carry_forward_across_batches() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut first = ResourceSupplyProcessor::new();
        first
            .observe_event(
                &resource(1),
                &EventKind::FungibleMinted {
                    amount: TokenAmount::from_i64(10),
                },
                StateVersion::new(5),
            )
            .unwrap();
        run(&mut first, &store);

        let mut second = ResourceSupplyProcessor::new();
        second
            .observe_event(
                &resource(1),
                &EventKind::FungibleBurned {
                    amount: TokenAmount::from_i64(4),
                },
                StateVersion::new(9),
            )
            .unwrap();
        let rows = run(&mut second, &store);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_minted, TokenAmount::from_i64(10));
        assert_eq!(rows[0].total_burned, TokenAmount::from_i64(4));
        assert_eq!(rows[0].total_supply, TokenAmount::from_i64(6));
    }

    #[test]
    fn mint_emitted_by_non_resource_is_a_type_mismatch() {
        let emitter = ResolvedEntity {
            entity_type: EntityType::Component,
            ..resource(1)
        };

        let mut processor = ResourceSupplyProcessor::new();
        let result = processor.observe_event(
            &emitter,
            &EventKind::FungibleMinted {
                amount: TokenAmount::from_i64(1),
            },
            StateVersion::new(10),
        );
        assert!(matches!(result, Err(LedgerError::EntityTypeMismatch { .. })));
    }

    #[test]
    fn deposit_and_withdraw_events_are_ignored() {
        let mut processor = ResourceSupplyProcessor::new();
        processor
            .observe_event(
                &resource(1),
                &EventKind::FungibleDeposited {
                    amount: TokenAmount::from_i64(1),
                },
                StateVersion::new(10),
            )
            .unwrap();
        assert!(processor.tracker.is_empty());
    }
}
