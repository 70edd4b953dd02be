//! Vault balance history rows and the current resource-holders side table.

use super::codec::{read_amount, read_u64, write_amount};
use super::{CurrentRow, HistoryRow};
use crate::{StoreResult, Table};
use vellum_core::{EntityId, StateVersion, TokenAmount};

/// Absolute balance of one vault after one state version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultBalanceRow {
    pub id: u64,
    pub from_state_version: StateVersion,
    pub vault_entity_id: EntityId,
    pub owner_entity_id: EntityId,
    pub resource_entity_id: EntityId,
    pub balance: TokenAmount,
}

impl VaultBalanceRow {
    pub fn subject_prefix(vault_entity_id: EntityId) -> Vec<u8> {
        vault_entity_id.to_be_bytes().to_vec()
    }
}

impl HistoryRow for VaultBalanceRow {
    const TABLE: Table = Table::VaultBalanceHistory;

    fn key(&self) -> Vec<u8> {
        let mut key = Self::subject_prefix(self.vault_entity_id);
        key.extend_from_slice(&self.from_state_version.to_be_bytes());
        key
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.extend_from_slice(&self.from_state_version.to_be_bytes());
        buf.extend_from_slice(&self.vault_entity_id.to_be_bytes());
        buf.extend_from_slice(&self.owner_entity_id.to_be_bytes());
        buf.extend_from_slice(&self.resource_entity_id.to_be_bytes());
        write_amount(&mut buf, &self.balance);
        buf
    }

    fn decode(value: &[u8]) -> StoreResult<Self> {
        let mut data = value;
        let id = read_u64(&mut data, "vault.id")?;
        let from_state_version = StateVersion::new(read_u64(&mut data, "vault.version")?);
        let vault_entity_id = EntityId::new(read_u64(&mut data, "vault.vault_id")?);
        let owner_entity_id = EntityId::new(read_u64(&mut data, "vault.owner_id")?);
        let resource_entity_id = EntityId::new(read_u64(&mut data, "vault.resource_id")?);
        let balance = read_amount(&mut data, "vault.balance")?;

        Ok(Self {
            id,
            from_state_version,
            vault_entity_id,
            owner_entity_id,
            resource_entity_id,
            balance,
        })
    }
}

/// Current total balance one owner holds of one resource, summed over the
/// owner's vaults. Zero-balance rows are deleted, so the table always reads
/// as "current holders".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHolderRow {
    pub owner_entity_id: EntityId,
    pub resource_entity_id: EntityId,
    pub balance: TokenAmount,
    pub last_updated_at: StateVersion,
}

impl ResourceHolderRow {
    pub fn storage_key(owner: EntityId, resource: EntityId) -> Vec<u8> {
        let mut key = owner.to_be_bytes().to_vec();
        key.extend_from_slice(&resource.to_be_bytes());
        key
    }
}

impl CurrentRow for ResourceHolderRow {
    const TABLE: Table = Table::ResourceHolders;

    fn key(&self) -> Vec<u8> {
        Self::storage_key(self.owner_entity_id, self.resource_entity_id)
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.owner_entity_id.to_be_bytes());
        buf.extend_from_slice(&self.resource_entity_id.to_be_bytes());
        write_amount(&mut buf, &self.balance);
        buf.extend_from_slice(&self.last_updated_at.to_be_bytes());
        buf
    }

    fn decode(value: &[u8]) -> StoreResult<Self> {
        let mut data = value;
        let owner_entity_id = EntityId::new(read_u64(&mut data, "holder.owner_id")?);
        let resource_entity_id = EntityId::new(read_u64(&mut data, "holder.resource_id")?);
        let balance = read_amount(&mut data, "holder.balance")?;
        let last_updated_at = StateVersion::new(read_u64(&mut data, "holder.version")?);

        Ok(Self {
            owner_entity_id,
            resource_entity_id,
            balance,
            last_updated_at,
        })
    }

    fn is_empty_value(&self) -> bool {
        self.balance.is_zero()
    }
}
