//! Entity rows: one per ledger entity, keyed by address.

use super::codec::{
    read_opt_u64, read_string, read_u64, read_u8, write_opt_u64, write_string,
};
use crate::{StoreError, StoreResult, Table};
use vellum_core::{EntityAddress, EntityId, EntityType, StateVersion};

/// A resolved ledger entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRow {
    pub id: EntityId,
    pub address: EntityAddress,
    pub entity_type: EntityType,
    /// Owning entity, if any.
    pub parent_id: Option<EntityId>,
    /// For vaults: the resource held.
    pub fungible_resource_id: Option<EntityId>,
    /// Version of the transaction that created the entity.
    pub from_state_version: StateVersion,
}

impl EntityRow {
    pub const TABLE: Table = Table::Entities;

    pub fn storage_key(address: &EntityAddress) -> Vec<u8> {
        address.as_bytes().to_vec()
    }

    pub fn key(&self) -> Vec<u8> {
        Self::storage_key(&self.address)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.push(entity_type_tag(self.entity_type));
        write_opt_u64(&mut buf, self.parent_id.map(EntityId::number));
        write_opt_u64(&mut buf, self.fungible_resource_id.map(EntityId::number));
        buf.extend_from_slice(&self.from_state_version.to_be_bytes());
        write_string(&mut buf, self.address.as_str());
        buf
    }

    pub fn decode(value: &[u8]) -> StoreResult<Self> {
        let mut data = value;
        let id = EntityId::new(read_u64(&mut data, "entity.id")?);
        let entity_type = entity_type_from_tag(read_u8(&mut data, "entity.type")?)?;
        let parent_id = read_opt_u64(&mut data, "entity.parent_id")?.map(EntityId::new);
        let fungible_resource_id =
            read_opt_u64(&mut data, "entity.fungible_resource_id")?.map(EntityId::new);
        let from_state_version = StateVersion::new(read_u64(&mut data, "entity.version")?);
        let address = EntityAddress::new(read_string(&mut data, "entity.address")?);

        Ok(Self {
            id,
            address,
            entity_type,
            parent_id,
            fungible_resource_id,
            from_state_version,
        })
    }
}

fn entity_type_tag(entity_type: EntityType) -> u8 {
    match entity_type {
        EntityType::Component => 0,
        EntityType::Package => 1,
        EntityType::FungibleResource => 2,
        EntityType::FungibleVault => 3,
    }
}

fn entity_type_from_tag(tag: u8) -> StoreResult<EntityType> {
    match tag {
        0 => Ok(EntityType::Component),
        1 => Ok(EntityType::Package),
        2 => Ok(EntityType::FungibleResource),
        3 => Ok(EntityType::FungibleVault),
        other => Err(StoreError::Deserialization(format!(
            "entity.type: unknown tag {other}"
        ))),
    }
}
