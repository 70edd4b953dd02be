use std::collections::{HashMap, HashSet};

use vellum_core::{EntityId, StateVersion, SubstateData, UpsertedSubstate};
use vellum_store::rows::{MetadataAggregateRow, MetadataEntryRow};
use vellum_store::{Store, WriteBatch};

use crate::cache::MostRecentCache;
use crate::error::{LedgerError, LedgerResult};
use crate::processors::{Processor, RowCounts};
use crate::registry::ResolvedEntity;
use crate::sequences::{SequenceAllocator, SequenceKind};
use crate::tracker::ChangeTracker;
use crate::{read, write};

#[derive(Debug)]
struct MetadataChange {
    key: String,
    /// `None` is a tombstone: the key was removed at this version.
    value: Option<Vec<u8>>,
    is_locked: bool,
}

/// The canonical entry/aggregate reconciler, over metadata substates.
///
/// Every change appends an immutable entry row, deletions included. Each
/// touched entity also gets at most one aggregate row per state version: a
/// full snapshot of its live entry-row ids, most recently updated first.
/// Tombstoned keys leave the id list but keep their audit trail.
pub struct MetadataProcessor {
    tracker: ChangeTracker<(EntityId, StateVersion), Vec<MetadataChange>>,
    most_recent_entries: MostRecentCache<(EntityId, String), MetadataEntryRow>,
    most_recent_aggregates: MostRecentCache<EntityId, MetadataAggregateRow>,
    pending_entries: Vec<MetadataEntryRow>,
    /// Pending aggregates as an arena: within one state version the entity's
    /// row is edited through its index, a new version pushes a fresh clone.
    pending_aggregates: Vec<MetadataAggregateRow>,
    pending_index: HashMap<EntityId, usize>,
}

impl MetadataProcessor {
    pub fn new() -> Self {
        Self {
            tracker: ChangeTracker::new(),
            most_recent_entries: MostRecentCache::new(),
            most_recent_aggregates: MostRecentCache::new(),
            pending_entries: Vec::new(),
            pending_aggregates: Vec::new(),
            pending_index: HashMap::new(),
        }
    }

    /// Index of the pending aggregate for `entity_id` at `version`, cloning
    /// the latest known snapshot forward when this version has none yet.
    fn pending_aggregate_at(
        &mut self,
        entity_id: EntityId,
        version: StateVersion,
        sequences: &SequenceAllocator,
    ) -> usize {
        if let Some(&idx) = self.pending_index.get(&entity_id) {
            if self.pending_aggregates[idx].from_state_version == version {
                return idx;
            }
        }

        let mut next = match self.pending_index.get(&entity_id) {
            Some(&idx) => self.pending_aggregates[idx].clone(),
            None => self
                .most_recent_aggregates
                .cloned_or_else(&entity_id, || MetadataAggregateRow {
                    id: 0,
                    from_state_version: version,
                    entity_id,
                    entry_ids: Vec::new(),
                }),
        };
        next.id = sequences.next(SequenceKind::MetadataAggregate);
        next.from_state_version = version;

        self.pending_aggregates.push(next);
        let idx = self.pending_aggregates.len() - 1;
        self.pending_index.insert(entity_id, idx);
        idx
    }
}

impl Default for MetadataProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for MetadataProcessor {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn observe_substate(
        &mut self,
        subject: &ResolvedEntity,
        substate: &UpsertedSubstate,
        version: StateVersion,
    ) -> LedgerResult<()> {
        if let SubstateData::MetadataEntry {
            key,
            value,
            is_locked,
        } = &substate.data
        {
            self.tracker
                .get_or_add((subject.id, version), Vec::new)
                .push(MetadataChange {
                    key: key.clone(),
                    value: value.clone(),
                    is_locked: *is_locked,
                });
        }
        Ok(())
    }

    fn load(&mut self, store: &dyn Store) -> LedgerResult<()> {
        let mut entry_keys: HashSet<(EntityId, String)> = HashSet::new();
        let mut aggregate_keys: HashSet<EntityId> = HashSet::new();
        for ((entity_id, _), changes) in self.tracker.entries() {
            aggregate_keys.insert(*entity_id);
            for change in changes {
                entry_keys.insert((*entity_id, change.key.clone()));
            }
        }

        self.most_recent_entries
            .populate(read::load_most_recent(store, entry_keys, |(entity, key)| {
                MetadataEntryRow::subject_prefix(*entity, key)
            })?);
        self.most_recent_aggregates
            .populate(read::load_most_recent(store, aggregate_keys, |entity| {
                MetadataAggregateRow::subject_prefix(*entity)
            })?);
        Ok(())
    }

    fn reconcile(&mut self, sequences: &SequenceAllocator) -> LedgerResult<()> {
        let tracker = std::mem::take(&mut self.tracker);
        for ((entity_id, version), changes) in tracker.entries() {
            let aggregate_idx = self.pending_aggregate_at(*entity_id, *version, sequences);

            for change in changes {
                let subject = (*entity_id, change.key.clone());
                if let Some(previous) = self.most_recent_entries.try_get(&subject) {
                    if previous.from_state_version > *version {
                        return Err(LedgerError::OutOfOrderObservation {
                            subject: format!("metadata {} of entity {entity_id}", change.key),
                            observed: *version,
                            materialized: previous.from_state_version,
                        });
                    }
                }

                let entry = MetadataEntryRow {
                    id: sequences.next(SequenceKind::MetadataEntry),
                    from_state_version: *version,
                    entity_id: *entity_id,
                    key: change.key.clone(),
                    value: change.value.clone(),
                    is_deleted: change.value.is_none(),
                    is_locked: change.is_locked,
                };

                let aggregate = &mut self.pending_aggregates[aggregate_idx];
                if let Some(previous) = self.most_recent_entries.try_get(&subject) {
                    aggregate.entry_ids.retain(|id| *id != previous.id);
                }
                if !entry.is_deleted {
                    aggregate.entry_ids.insert(0, entry.id);
                }

                self.most_recent_entries.insert(subject, entry.clone());
                self.pending_entries.push(entry);
            }
        }
        Ok(())
    }

    fn persist(&mut self, batch: &mut WriteBatch) -> LedgerResult<RowCounts> {
        let appended = write::append_rows(batch, &self.pending_entries)
            + write::append_rows(batch, &self.pending_aggregates);
        Ok(RowCounts {
            appended,
            deleted: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vellum_core::{EntityAddress, EntityType};
    use vellum_store::rows::HistoryRow;
    use vellum_store::Database;

    fn entity(id: u64) -> ResolvedEntity {
        ResolvedEntity {
            id: EntityId::new(id),
            address: EntityAddress::new(format!("component_{id}")),
            entity_type: EntityType::Component,
            parent_id: None,
            fungible_resource_id: None,
            from_state_version: StateVersion::new(1),
        }
    }

    fn metadata_upsert(key: &str, value: Option<&[u8]>) -> UpsertedSubstate {
        UpsertedSubstate::new(
            "ignored",
            SubstateData::MetadataEntry {
                key: key.to_owned(),
                value: value.map(|v| v.to_vec()),
                is_locked: false,
            },
        )
    }

    fn run(
        processor: &mut MetadataProcessor,
        store: &Database,
    ) -> (Vec<MetadataEntryRow>, Vec<MetadataAggregateRow>) {
        let sequences = SequenceAllocator::load(store).unwrap();
        processor.load(store).unwrap();
        processor.reconcile(&sequences).unwrap();

        let mut batch = WriteBatch::new();
        processor.persist(&mut batch).unwrap();
        sequences.stage(&mut batch);
        store.write_batch(batch).unwrap();

        (
            processor.pending_entries.clone(),
            processor.pending_aggregates.clone(),
        )
    }

    #[test]
    fn first_observation_creates_entry_and_singleton_aggregate() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut processor = MetadataProcessor::new();
        processor
            .observe_substate(
                &entity(1),
                &metadata_upsert("name", Some(b"x")),
                StateVersion::new(10),
            )
            .unwrap();

        let (entries, aggregates) = run(&mut processor, &store);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].from_state_version, StateVersion::new(10));
        assert_eq!(entries[0].value, Some(b"x".to_vec()));
        assert!(!entries[0].is_deleted);

        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].from_state_version, StateVersion::new(10));
        assert_eq!(aggregates[0].entry_ids, vec![entries[0].id]);
    }

    #[test]
    fn update_supersedes_old_id_in_aggregate() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut first = MetadataProcessor::new();
        first
            .observe_substate(
                &entity(1),
                &metadata_upsert("name", Some(b"x")),
                StateVersion::new(10),
            )
            .unwrap();
        let (old_entries, _) = run(&mut first, &store);

        // Second batch updates the same key at a later version.
        let mut second = MetadataProcessor::new();
        second
            .observe_substate(
                &entity(1),
                &metadata_upsert("name", Some(b"y")),
                StateVersion::new(20),
            )
            .unwrap();
        let (entries, aggregates) = run(&mut second, &store);

        assert_eq!(entries.len(), 1);
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].entry_ids, vec![entries[0].id]);
        assert_ne!(entries[0].id, old_entries[0].id);

        // Full entry history is still on disk.
        let stored: Vec<_> = store
            .iter_prefix(
                MetadataEntryRow::TABLE,
                &MetadataEntryRow::subject_prefix(EntityId::new(1), "name"),
            )
            .unwrap()
            .collect();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn same_version_fan_in_shares_one_aggregate_row() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut processor = MetadataProcessor::new();
        processor
            .observe_substate(
                &entity(1),
                &metadata_upsert("name", Some(b"x")),
                StateVersion::new(10),
            )
            .unwrap();
        processor
            .observe_substate(
                &entity(1),
                &metadata_upsert("description", Some(b"y")),
                StateVersion::new(10),
            )
            .unwrap();

        let (entries, aggregates) = run(&mut processor, &store);
        assert_eq!(entries.len(), 2);
        assert_eq!(aggregates.len(), 1);
        // Most recently updated first.
        assert_eq!(aggregates[0].entry_ids, vec![entries[1].id, entries[0].id]);
    }

    #[test]
    fn tombstone_leaves_aggregate_but_keeps_history() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut first = MetadataProcessor::new();
        first
            .observe_substate(
                &entity(1),
                &metadata_upsert("name", Some(b"x")),
                StateVersion::new(10),
            )
            .unwrap();
        first
            .observe_substate(
                &entity(1),
                &metadata_upsert("description", Some(b"d")),
                StateVersion::new(10),
            )
            .unwrap();
        run(&mut first, &store);

        let mut second = MetadataProcessor::new();
        second
            .observe_substate(&entity(1), &metadata_upsert("name", None), StateVersion::new(15))
            .unwrap();
        let (entries, aggregates) = run(&mut second, &store);

        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_deleted);
        // Only the surviving key remains listed.
        assert_eq!(aggregates[0].entry_ids.len(), 1);
        assert!(!aggregates[0].entry_ids.contains(&entries[0].id));
    }

    #[test]
    fn deletion_then_recreation_at_one_version_lists_the_entry_once() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut processor = MetadataProcessor::new();
        processor
            .observe_substate(&entity(1), &metadata_upsert("name", None), StateVersion::new(10))
            .unwrap();
        processor
            .observe_substate(
                &entity(1),
                &metadata_upsert("name", Some(b"back")),
                StateVersion::new(10),
            )
            .unwrap();

        let (entries, aggregates) = run(&mut processor, &store);
        // Both observations are audited; the last one wins the listing.
        assert_eq!(entries.len(), 2);
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].entry_ids, vec![entries[1].id]);
    }

    #[test]
    fn distinct_entities_get_distinct_aggregates() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut processor = MetadataProcessor::new();
        processor
            .observe_substate(
                &entity(1),
                &metadata_upsert("name", Some(b"a")),
                StateVersion::new(10),
            )
            .unwrap();
        processor
            .observe_substate(
                &entity(2),
                &metadata_upsert("name", Some(b"b")),
                StateVersion::new(10),
            )
            .unwrap();

        let (_, aggregates) = run(&mut processor, &store);
        assert_eq!(aggregates.len(), 2);
        assert_ne!(aggregates[0].entity_id, aggregates[1].entity_id);
    }

    #[test]
    fn out_of_order_observation_aborts_reconciliation() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut first = MetadataProcessor::new();
        first
            .observe_substate(
                &entity(1),
                &metadata_upsert("name", Some(b"x")),
                StateVersion::new(20),
            )
            .unwrap();
        run(&mut first, &store);

        let mut second = MetadataProcessor::new();
        second
            .observe_substate(
                &entity(1),
                &metadata_upsert("name", Some(b"stale")),
                StateVersion::new(10),
            )
            .unwrap();

        let sequences = SequenceAllocator::load(&store).unwrap();
        second.load(&store).unwrap();
        let result = second.reconcile(&sequences);
        assert!(matches!(
            result,
            Err(LedgerError::OutOfOrderObservation { observed, materialized, .. })
                if observed == StateVersion::new(10) && materialized == StateVersion::new(20)
        ));
    }

    #[test]
    fn unrecognized_substates_are_ignored() {
        let mut processor = MetadataProcessor::new();
        processor
            .observe_substate(
                &entity(1),
                &UpsertedSubstate::new(
                    "ignored",
                    SubstateData::RoleAssignmentEntry {
                        role_key: "owner".to_owned(),
                        rule: vec![1],
                    },
                ),
                StateVersion::new(10),
            )
            .unwrap();
        assert!(processor.tracker.is_empty());
    }
}
