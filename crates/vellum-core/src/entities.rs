//! Entity declarations carried by the transaction feed.

use crate::types::EntityAddress;

/// The kind of a ledger entity, as declared at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Component,
    Package,
    FungibleResource,
    FungibleVault,
}

impl EntityType {
    pub fn name(&self) -> &'static str {
        match self {
            EntityType::Component => "component",
            EntityType::Package => "package",
            EntityType::FungibleResource => "fungible_resource",
            EntityType::FungibleVault => "fungible_vault",
        }
    }
}

/// An entity created by a committed transaction.
///
/// Vaults must name the fungible resource they hold; the link is resolved to
/// an internal id after the whole batch has been scanned, so a vault may
/// legally precede its resource in feed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntity {
    pub address: EntityAddress,
    pub entity_type: EntityType,
    /// Owning entity, if any. Vaults always have one.
    pub parent: Option<EntityAddress>,
    /// For vaults: the resource held.
    pub fungible_resource: Option<EntityAddress>,
}

impl NewEntity {
    pub fn component(address: impl Into<EntityAddress>) -> Self {
        Self {
            address: address.into(),
            entity_type: EntityType::Component,
            parent: None,
            fungible_resource: None,
        }
    }

    pub fn package(address: impl Into<EntityAddress>) -> Self {
        Self {
            address: address.into(),
            entity_type: EntityType::Package,
            parent: None,
            fungible_resource: None,
        }
    }

    pub fn fungible_resource(address: impl Into<EntityAddress>) -> Self {
        Self {
            address: address.into(),
            entity_type: EntityType::FungibleResource,
            parent: None,
            fungible_resource: None,
        }
    }

    pub fn fungible_vault(
        address: impl Into<EntityAddress>,
        owner: impl Into<EntityAddress>,
        resource: impl Into<EntityAddress>,
    ) -> Self {
        Self {
            address: address.into(),
            entity_type: EntityType::FungibleVault,
            parent: Some(owner.into()),
            fungible_resource: Some(resource.into()),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<EntityAddress>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}
