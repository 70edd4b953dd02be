//! Metadata history rows: per-key entry history plus a per-entity aggregate
//! carrying the MRU-ordered list of live entry row ids.

use super::codec::{read_bool, read_opt_bytes, read_string, read_u32, read_u64, write_opt_bytes, write_string};
use super::HistoryRow;
use crate::{StoreResult, Table};
use blake2::{Blake2b, Digest};
use vellum_core::{EntityId, StateVersion};

/// Blake2b with 256-bit output, for fixed-width key digests.
type Blake2b256 = Blake2b<blake2::digest::consts::U32>;

/// One metadata key's value at one state version. Appended for every change,
/// including deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntryRow {
    pub id: u64,
    pub from_state_version: StateVersion,
    pub entity_id: EntityId,
    pub key: String,
    pub value: Option<Vec<u8>>,
    pub is_deleted: bool,
    pub is_locked: bool,
}

impl MetadataEntryRow {
    /// Storage prefix for one `(entity, metadata key)` subject. The key
    /// string is digested so composite keys stay fixed-width; the full
    /// string lives in the row value.
    pub fn subject_prefix(entity_id: EntityId, key: &str) -> Vec<u8> {
        let mut prefix = entity_id.to_be_bytes().to_vec();
        prefix.extend_from_slice(&Blake2b256::digest(key.as_bytes()));
        prefix
    }
}

impl HistoryRow for MetadataEntryRow {
    const TABLE: Table = Table::MetadataEntryHistory;

    fn key(&self) -> Vec<u8> {
        let mut key = Self::subject_prefix(self.entity_id, &self.key);
        key.extend_from_slice(&self.from_state_version.to_be_bytes());
        key
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.extend_from_slice(&self.from_state_version.to_be_bytes());
        buf.extend_from_slice(&self.entity_id.to_be_bytes());
        write_string(&mut buf, &self.key);
        write_opt_bytes(&mut buf, self.value.as_deref());
        buf.push(self.is_deleted as u8);
        buf.push(self.is_locked as u8);
        buf
    }

    fn decode(value: &[u8]) -> StoreResult<Self> {
        let mut data = value;
        let id = read_u64(&mut data, "metadata_entry.id")?;
        let from_state_version =
            StateVersion::new(read_u64(&mut data, "metadata_entry.version")?);
        let entity_id = EntityId::new(read_u64(&mut data, "metadata_entry.entity_id")?);
        let key = read_string(&mut data, "metadata_entry.key")?;
        let entry_value = read_opt_bytes(&mut data, "metadata_entry.value")?;
        let is_deleted = read_bool(&mut data, "metadata_entry.is_deleted")?;
        let is_locked = read_bool(&mut data, "metadata_entry.is_locked")?;

        Ok(Self {
            id,
            from_state_version,
            entity_id,
            key,
            value: entry_value,
            is_deleted,
            is_locked,
        })
    }
}

/// Full snapshot of an entity's live metadata at one state version:
/// entry row ids, most recently updated first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataAggregateRow {
    pub id: u64,
    pub from_state_version: StateVersion,
    pub entity_id: EntityId,
    pub entry_ids: Vec<u64>,
}

impl MetadataAggregateRow {
    pub fn subject_prefix(entity_id: EntityId) -> Vec<u8> {
        entity_id.to_be_bytes().to_vec()
    }
}

impl HistoryRow for MetadataAggregateRow {
    const TABLE: Table = Table::MetadataAggregateHistory;

    fn key(&self) -> Vec<u8> {
        let mut key = Self::subject_prefix(self.entity_id);
        key.extend_from_slice(&self.from_state_version.to_be_bytes());
        key
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.extend_from_slice(&self.from_state_version.to_be_bytes());
        buf.extend_from_slice(&self.entity_id.to_be_bytes());
        buf.extend_from_slice(&(self.entry_ids.len() as u32).to_be_bytes());
        for entry_id in &self.entry_ids {
            buf.extend_from_slice(&entry_id.to_be_bytes());
        }
        buf
    }

    fn decode(value: &[u8]) -> StoreResult<Self> {
        let mut data = value;
        let id = read_u64(&mut data, "metadata_aggregate.id")?;
        let from_state_version =
            StateVersion::new(read_u64(&mut data, "metadata_aggregate.version")?);
        let entity_id = EntityId::new(read_u64(&mut data, "metadata_aggregate.entity_id")?);
        let count = read_u32(&mut data, "metadata_aggregate.entry_count")? as usize;
        let mut entry_ids = Vec::with_capacity(count);
        for _ in 0..count {
            entry_ids.push(read_u64(&mut data, "metadata_aggregate.entry_id")?);
        }

        Ok(Self {
            id,
            from_state_version,
            entity_id,
            entry_ids,
        })
    }
}
