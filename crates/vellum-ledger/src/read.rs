use std::collections::HashMap;
use std::hash::Hash;

use vellum_store::rows::{CurrentRow, HistoryRow};
use vellum_store::Store;

use crate::error::LedgerResult;

/// Most-recent history row per subject, for a whole set of subjects in one
/// store call.
///
/// `prefix_of` maps a subject key to its storage prefix; the latest row under
/// each prefix is the subject's most recent one. Subjects with no history are
/// absent from the result, and an empty key set never touches the store.
pub fn load_most_recent<K, R>(
    store: &dyn Store,
    keys: impl IntoIterator<Item = K>,
    prefix_of: impl Fn(&K) -> Vec<u8>,
) -> LedgerResult<HashMap<K, R>>
where
    K: Eq + Hash,
    R: HistoryRow,
{
    let keys: Vec<K> = keys.into_iter().collect();
    if keys.is_empty() {
        return Ok(HashMap::new());
    }

    let prefixes: Vec<Vec<u8>> = keys.iter().map(&prefix_of).collect();
    let prefix_refs: Vec<&[u8]> = prefixes.iter().map(|prefix| prefix.as_slice()).collect();
    let found = store.multi_last_in_prefix(R::TABLE, &prefix_refs)?;

    let mut rows = HashMap::with_capacity(keys.len());
    for (key, hit) in keys.into_iter().zip(found) {
        if let Some((_, value)) = hit {
            rows.insert(key, R::decode(&value)?);
        }
    }
    Ok(rows)
}

/// Current-value rows for a whole set of subjects in one store call.
///
/// Same contract as [`load_most_recent`], but over a mutable side table with
/// exact keys instead of versioned history prefixes.
pub fn load_current<K, R>(
    store: &dyn Store,
    keys: impl IntoIterator<Item = K>,
    key_of: impl Fn(&K) -> Vec<u8>,
) -> LedgerResult<HashMap<K, R>>
where
    K: Eq + Hash,
    R: CurrentRow,
{
    let keys: Vec<K> = keys.into_iter().collect();
    if keys.is_empty() {
        return Ok(HashMap::new());
    }

    let storage_keys: Vec<Vec<u8>> = keys.iter().map(&key_of).collect();
    let key_refs: Vec<&[u8]> = storage_keys.iter().map(|key| key.as_slice()).collect();
    let found = store.multi_get(R::TABLE, &key_refs)?;

    let mut rows = HashMap::with_capacity(keys.len());
    for (key, hit) in keys.into_iter().zip(found) {
        if let Some(value) = hit {
            rows.insert(key, R::decode(&value)?);
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vellum_core::{EntityId, StateVersion, TokenAmount};
    use vellum_store::rows::{ResourceHolderRow, ResourceSupplyRow};
    use vellum_store::{Database, WriteBatch};

    fn supply_row(resource: u64, version: u64, supply: i64) -> ResourceSupplyRow {
        ResourceSupplyRow {
            id: version,
            from_state_version: StateVersion::new(version),
            resource_entity_id: EntityId::new(resource),
            total_supply: TokenAmount::from_i64(supply),
            total_minted: TokenAmount::from_i64(supply),
            total_burned: TokenAmount::zero(),
        }
    }

    #[test]
    fn load_most_recent_picks_greatest_version_per_subject() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let mut batch = WriteBatch::new();
        for row in [
            supply_row(1, 10, 5),
            supply_row(1, 30, 8),
            supply_row(1, 20, 6),
            supply_row(2, 15, 100),
        ] {
            batch.put(ResourceSupplyRow::TABLE, row.key(), row.encode());
        }
        store.write_batch(batch).unwrap();

        let rows: HashMap<EntityId, ResourceSupplyRow> = load_most_recent(
            &store,
            [EntityId::new(1), EntityId::new(2), EntityId::new(3)],
            |resource| ResourceSupplyRow::subject_prefix(*resource),
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[&EntityId::new(1)].from_state_version,
            StateVersion::new(30)
        );
        assert_eq!(
            rows[&EntityId::new(2)].from_state_version,
            StateVersion::new(15)
        );
        // No history means no entry, not a null value.
        assert!(!rows.contains_key(&EntityId::new(3)));
    }

    #[test]
    fn empty_key_set_short_circuits() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let rows: HashMap<EntityId, ResourceSupplyRow> =
            load_most_recent(&store, [], |resource: &EntityId| {
                ResourceSupplyRow::subject_prefix(*resource)
            })
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn load_current_returns_only_present_rows() {
        let dir = TempDir::new().unwrap();
        let store = Database::open(dir.path()).unwrap();

        let row = ResourceHolderRow {
            owner_entity_id: EntityId::new(4),
            resource_entity_id: EntityId::new(9),
            balance: TokenAmount::from_i64(25),
            last_updated_at: StateVersion::new(3),
        };
        let mut batch = WriteBatch::new();
        batch.put(ResourceHolderRow::TABLE, row.key(), row.encode());
        store.write_batch(batch).unwrap();

        let rows: HashMap<(EntityId, EntityId), ResourceHolderRow> = load_current(
            &store,
            [
                (EntityId::new(4), EntityId::new(9)),
                (EntityId::new(4), EntityId::new(1)),
            ],
            |(owner, resource)| ResourceHolderRow::storage_key(*owner, *resource),
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[&(EntityId::new(4), EntityId::new(9))].balance,
            TokenAmount::from_i64(25)
        );
    }
}
