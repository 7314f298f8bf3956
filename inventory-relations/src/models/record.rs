use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CatalogEntity;

/// Identifier the remote store assigns to an association record
pub type RemoteId = u64;

/// Identifier of an inventory item (the owning side of an association)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

/// Identifier of a catalog entity (color id, material id, ...)
///
/// This is the natural key of a record inside one relation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Identity of an association record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordId {
    /// Id returned by the remote store
    Persisted(RemoteId),
    /// Client-side placeholder until the create call returns a real id
    Draft(Uuid),
}

impl RecordId {
    /// Fresh placeholder id for a record that has not been created remotely
    pub fn draft() -> Self {
        Self::Draft(Uuid::new_v4())
    }

    /// The remote id, if the record has been persisted
    pub fn remote(&self) -> Option<RemoteId> {
        match self {
            Self::Persisted(id) => Some(*id),
            Self::Draft(_) => None,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Persisted(id) => write!(f, "{}", id),
            RecordId::Draft(uuid) => write!(f, "draft-{}", uuid),
        }
    }
}

/// One item <-> catalog entity link
///
/// `E` is the denormalized catalog payload kept for display. It never takes
/// part in identity or diffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRecord<E> {
    /// Remote id, or a draft placeholder for unsaved records
    pub id: RecordId,
    /// Owning inventory item (unset while the item itself is being created)
    pub owner_id: Option<ItemId>,
    /// Catalog entity this record links to
    pub entity_id: EntityId,
    /// Whether this is the item's primary entity of this kind
    pub is_primary: bool,
    /// Display copy of the catalog entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<E>,
}

impl<E> AssociationRecord<E> {
    /// Create an unsaved record with a draft id
    pub fn draft(entity_id: EntityId, is_primary: bool) -> Self {
        Self {
            id: RecordId::draft(),
            owner_id: None,
            entity_id,
            is_primary,
            entity: None,
        }
    }

    /// Create a record as loaded from the remote store
    pub fn persisted(
        id: RemoteId,
        owner_id: ItemId,
        entity_id: EntityId,
        is_primary: bool,
    ) -> Self {
        Self {
            id: RecordId::Persisted(id),
            owner_id: Some(owner_id),
            entity_id,
            is_primary,
            entity: None,
        }
    }

    /// Attach the display payload
    pub fn with_entity(mut self, entity: E) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Remote id, if the record has been persisted
    pub fn remote_id(&self) -> Option<RemoteId> {
        self.id.remote()
    }
}

impl<E: CatalogEntity + Clone> AssociationRecord<E> {
    /// Draft record for a catalog entity dragged in from the available pool
    pub fn from_entity(entity: &E) -> Self {
        Self::draft(entity.entity_id(), false).with_entity(entity.clone())
    }
}
