use std::collections::{HashMap, HashSet};

use vellum_core::{
    CommittedTransaction, EntityAddress, EntityId, EntityType, NewEntity, StateVersion,
};
use vellum_store::rows::EntityRow;
use vellum_store::{Store, Table};

use crate::cancel::CancellationToken;
use crate::error::{LedgerError, LedgerResult};
use crate::sequences::{SequenceAllocator, SequenceKind};

/// An entity with its internal id and resolved links.
#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    pub id: EntityId,
    pub address: EntityAddress,
    pub entity_type: EntityType,
    pub parent_id: Option<EntityId>,
    pub fungible_resource_id: Option<EntityId>,
    pub from_state_version: StateVersion,
}

impl ResolvedEntity {
    fn from_row(row: EntityRow) -> Self {
        Self {
            id: row.id,
            address: row.address,
            entity_type: row.entity_type,
            parent_id: row.parent_id,
            fungible_resource_id: row.fungible_resource_id,
            from_state_version: row.from_state_version,
        }
    }

    pub fn is_vault(&self) -> bool {
        self.entity_type == EntityType::FungibleVault
    }

    /// Owning entity of a vault. Set for every vault by resolution.
    pub fn vault_owner(&self) -> LedgerResult<EntityId> {
        self.parent_id
            .ok_or_else(|| LedgerError::IncompleteVault(self.address.clone()))
    }

    /// Resource held by a vault. Set for every vault by resolution.
    pub fn vault_resource(&self) -> LedgerResult<EntityId> {
        self.fungible_resource_id
            .ok_or_else(|| LedgerError::IncompleteVault(self.address.clone()))
    }
}

type PostResolveFn = Box<dyn FnOnce(&mut EntityRegistry) -> LedgerResult<()>>;

/// Collects every address a batch touches, resolves all of them against the
/// store in one set-based lookup, and assigns fresh ids to entities the batch
/// creates.
///
/// Links between created entities may point forward in the feed, so link
/// wiring is deferred: declaring an entity registers callbacks that run once
/// every address has an id.
pub struct EntityRegistry {
    entities: HashMap<EntityAddress, ResolvedEntity>,
    referenced: Vec<EntityAddress>,
    referenced_set: HashSet<EntityAddress>,
    created: Vec<(NewEntity, StateVersion)>,
    created_set: HashSet<EntityAddress>,
    deferred: Vec<PostResolveFn>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            referenced: Vec::new(),
            referenced_set: HashSet::new(),
            created: Vec::new(),
            created_set: HashSet::new(),
            deferred: Vec::new(),
        }
    }

    /// Record every address `tx` creates or references.
    pub fn scan_transaction(&mut self, tx: &CommittedTransaction) -> LedgerResult<()> {
        for created in &tx.created_entities {
            self.declare_created(created.clone(), tx.state_version)?;
        }
        for substate in &tx.substates {
            self.reference(&substate.subject);
        }
        for event in &tx.events {
            self.reference(&event.emitter);
        }
        Ok(())
    }

    fn declare_created(&mut self, entity: NewEntity, version: StateVersion) -> LedgerResult<()> {
        if !self.created_set.insert(entity.address.clone()) {
            return Err(LedgerError::DuplicateEntity(entity.address));
        }
        if entity.entity_type == EntityType::FungibleVault
            && (entity.parent.is_none() || entity.fungible_resource.is_none())
        {
            return Err(LedgerError::IncompleteVault(entity.address));
        }
        self.reference(&entity.address);

        if let Some(parent) = entity.parent.clone() {
            self.reference(&parent);
            let address = entity.address.clone();
            self.deferred.push(Box::new(move |registry| {
                let parent_id = registry.resolved(&parent)?.id;
                registry.entity_mut(&address)?.parent_id = Some(parent_id);
                Ok(())
            }));
        }
        if let Some(resource) = entity.fungible_resource.clone() {
            self.reference(&resource);
            let address = entity.address.clone();
            self.deferred.push(Box::new(move |registry| {
                let target = registry.resolved(&resource)?;
                if target.entity_type != EntityType::FungibleResource {
                    return Err(LedgerError::EntityTypeMismatch {
                        address: resource.clone(),
                        expected: EntityType::FungibleResource.name(),
                        actual: target.entity_type.name(),
                    });
                }
                let resource_id = target.id;
                registry.entity_mut(&address)?.fungible_resource_id = Some(resource_id);
                Ok(())
            }));
        }

        self.created.push((entity, version));
        Ok(())
    }

    fn reference(&mut self, address: &EntityAddress) {
        if self.referenced_set.insert(address.clone()) {
            self.referenced.push(address.clone());
        }
    }

    /// Resolve every collected address: one bulk store lookup, id assignment
    /// for created entities in declaration order, then the deferred link
    /// callbacks in registration order.
    pub fn resolve(
        &mut self,
        store: &dyn Store,
        sequences: &SequenceAllocator,
        token: &CancellationToken,
    ) -> LedgerResult<()> {
        token.bail_if_cancelled()?;

        if !self.referenced.is_empty() {
            let keys: Vec<Vec<u8>> = self
                .referenced
                .iter()
                .map(|address| EntityRow::storage_key(address))
                .collect();
            let key_refs: Vec<&[u8]> = keys.iter().map(|key| key.as_slice()).collect();
            let found = store.multi_get(Table::Entities, &key_refs)?;
            for (address, value) in self.referenced.iter().zip(found) {
                if let Some(value) = value {
                    let row = EntityRow::decode(&value)?;
                    self.entities
                        .insert(address.clone(), ResolvedEntity::from_row(row));
                }
            }
        }

        for (declared, version) in &self.created {
            if self.entities.contains_key(&declared.address) {
                return Err(LedgerError::DuplicateEntity(declared.address.clone()));
            }
            let id = EntityId::new(sequences.next(SequenceKind::Entity));
            self.entities.insert(
                declared.address.clone(),
                ResolvedEntity {
                    id,
                    address: declared.address.clone(),
                    entity_type: declared.entity_type,
                    parent_id: None,
                    fungible_resource_id: None,
                    from_state_version: *version,
                },
            );
        }

        for address in &self.referenced {
            if !self.entities.contains_key(address) {
                return Err(LedgerError::MissingEntity(address.clone()));
            }
        }

        let deferred = std::mem::take(&mut self.deferred);
        for callback in deferred {
            callback(self)?;
        }
        Ok(())
    }

    /// The resolved entity behind `address`. Valid only after [`resolve`].
    ///
    /// [`resolve`]: EntityRegistry::resolve
    pub fn resolved(&self, address: &EntityAddress) -> LedgerResult<&ResolvedEntity> {
        self.entities
            .get(address)
            .ok_or_else(|| LedgerError::MissingEntity(address.clone()))
    }

    fn entity_mut(&mut self, address: &EntityAddress) -> LedgerResult<&mut ResolvedEntity> {
        self.entities
            .get_mut(address)
            .ok_or_else(|| LedgerError::MissingEntity(address.clone()))
    }

    /// Storage rows for the entities this batch created, in declaration
    /// order.
    pub fn created_rows(&self) -> LedgerResult<Vec<EntityRow>> {
        self.created
            .iter()
            .map(|(declared, _)| {
                let entity = self.resolved(&declared.address)?;
                Ok(EntityRow {
                    id: entity.id,
                    address: entity.address.clone(),
                    entity_type: entity.entity_type,
                    parent_id: entity.parent_id,
                    fungible_resource_id: entity.fungible_resource_id,
                    from_state_version: entity.from_state_version,
                })
            })
            .collect()
    }

    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
