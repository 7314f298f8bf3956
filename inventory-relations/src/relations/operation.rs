//! Remote operations derived from a relation diff

use serde::{Deserialize, Serialize};

use super::diff::RelationDiff;
use crate::models::{EntityId, ItemId, RecordId};

/// Phase priorities (lower runs first)
pub mod priority {
    pub const DELETE: u8 = 16;
    pub const CREATE: u8 = 32;
    pub const UPDATE: u8 = 48;
}

/// Diff bucket an operation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Delete,
    Create,
    Update,
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Delete => write!(f, "delete"),
            Bucket::Create => write!(f, "create"),
            Bucket::Update => write!(f, "update"),
        }
    }
}

/// A single Relation Store call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationOperation {
    /// Delete an existing link
    Delete {
        entity_id: EntityId,
        /// Id of the baseline record
        id: RecordId,
    },
    /// Create a new link
    Create {
        owner_id: ItemId,
        entity_id: EntityId,
        is_primary: bool,
    },
    /// Change the primary flag of an existing link
    Update {
        entity_id: EntityId,
        /// Id of the baseline record
        id: RecordId,
        is_primary: bool,
    },
}

impl RelationOperation {
    pub fn entity_id(&self) -> EntityId {
        match self {
            Self::Delete { entity_id, .. } => *entity_id,
            Self::Create { entity_id, .. } => *entity_id,
            Self::Update { entity_id, .. } => *entity_id,
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            Self::Delete { .. } => Bucket::Delete,
            Self::Create { .. } => Bucket::Create,
            Self::Update { .. } => Bucket::Update,
        }
    }

    pub fn priority(&self) -> u8 {
        match self {
            Self::Delete { .. } => priority::DELETE,
            Self::Create { .. } => priority::CREATE,
            Self::Update { .. } => priority::UPDATE,
        }
    }

    /// Id of the record this operation addresses (creates have none yet)
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            Self::Delete { id, .. } | Self::Update { id, .. } => Some(*id),
            Self::Create { .. } => None,
        }
    }
}

/// Lower a diff into the ordered list of store calls for `owner_id`.
///
/// Deletes come first, then creates, then updates. Within a bucket the diff's
/// order is kept.
pub fn build_operations<E>(owner_id: ItemId, diff: &RelationDiff<E>) -> Vec<RelationOperation> {
    let deletes = diff.to_delete.iter().map(|r| RelationOperation::Delete {
        entity_id: r.entity_id,
        id: r.id,
    });
    let creates = diff.to_add.iter().map(|r| RelationOperation::Create {
        owner_id,
        entity_id: r.entity_id,
        is_primary: r.is_primary,
    });
    let updates = diff.to_update.iter().map(|r| RelationOperation::Update {
        entity_id: r.entity_id,
        id: r.id,
        is_primary: r.is_primary,
    });

    let mut operations: Vec<RelationOperation> = deletes.chain(creates).chain(updates).collect();
    // Stable: keeps per-bucket order
    operations.sort_by_key(|op| op.priority());
    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssociationRecord;

    #[test]
    fn test_operations_ordered_by_phase() {
        let diff: RelationDiff<()> = RelationDiff {
            to_add: vec![AssociationRecord::draft(EntityId(3), true)],
            to_delete: vec![
                AssociationRecord::persisted(10, ItemId(1), EntityId(1), false),
                AssociationRecord::persisted(11, ItemId(1), EntityId(2), false),
            ],
            to_update: vec![AssociationRecord::persisted(12, ItemId(1), EntityId(4), false)],
        };

        let ops = build_operations(ItemId(1), &diff);

        let buckets: Vec<Bucket> = ops.iter().map(|op| op.bucket()).collect();
        assert_eq!(
            buckets,
            vec![Bucket::Delete, Bucket::Delete, Bucket::Create, Bucket::Update]
        );
        let entities: Vec<u64> = ops.iter().map(|op| op.entity_id().0).collect();
        assert_eq!(entities, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_create_uses_owner() {
        let diff: RelationDiff<()> = RelationDiff {
            to_add: vec![AssociationRecord::draft(EntityId(3), true)],
            ..Default::default()
        };

        let ops = build_operations(ItemId(42), &diff);

        assert_eq!(
            ops,
            vec![RelationOperation::Create {
                owner_id: ItemId(42),
                entity_id: EntityId(3),
                is_primary: true,
            }]
        );
        assert_eq!(ops[0].record_id(), None);
    }

    #[test]
    fn test_empty_diff_has_no_operations() {
        let diff: RelationDiff<()> = RelationDiff::default();
        assert!(build_operations(ItemId(1), &diff).is_empty());
    }
}
