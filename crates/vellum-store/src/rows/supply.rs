//! Resource supply totals rows.

use super::codec::{read_amount, read_u64, write_amount};
use super::HistoryRow;
use crate::{StoreResult, Table};
use vellum_core::{EntityId, StateVersion, TokenAmount};

/// Running supply totals for one fungible resource, valid from one state
/// version until superseded. Each row is a full snapshot of all three
/// counters, not a delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSupplyRow {
    pub id: u64,
    pub from_state_version: StateVersion,
    pub resource_entity_id: EntityId,
    pub total_supply: TokenAmount,
    pub total_minted: TokenAmount,
    pub total_burned: TokenAmount,
}

impl ResourceSupplyRow {
    pub fn subject_prefix(resource_entity_id: EntityId) -> Vec<u8> {
        resource_entity_id.to_be_bytes().to_vec()
    }
}

impl HistoryRow for ResourceSupplyRow {
    const TABLE: Table = Table::ResourceSupplyHistory;

    fn key(&self) -> Vec<u8> {
        let mut key = Self::subject_prefix(self.resource_entity_id);
        key.extend_from_slice(&self.from_state_version.to_be_bytes());
        key
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.extend_from_slice(&self.from_state_version.to_be_bytes());
        buf.extend_from_slice(&self.resource_entity_id.to_be_bytes());
        write_amount(&mut buf, &self.total_supply);
        write_amount(&mut buf, &self.total_minted);
        write_amount(&mut buf, &self.total_burned);
        buf
    }

    fn decode(value: &[u8]) -> StoreResult<Self> {
        let mut data = value;
        let id = read_u64(&mut data, "supply.id")?;
        let from_state_version = StateVersion::new(read_u64(&mut data, "supply.version")?);
        let resource_entity_id = EntityId::new(read_u64(&mut data, "supply.resource_id")?);
        let total_supply = read_amount(&mut data, "supply.total_supply")?;
        let total_minted = read_amount(&mut data, "supply.total_minted")?;
        let total_burned = read_amount(&mut data, "supply.total_burned")?;

        Ok(Self {
            id,
            from_state_version,
            resource_entity_id,
            total_supply,
            total_minted,
            total_burned,
        })
    }
}
