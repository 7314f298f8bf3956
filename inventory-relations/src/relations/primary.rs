//! Single-primary invariant for relation sets

use crate::models::{AssociationRecord, EntityId};

/// Return a copy of `set` with the primary flag of `entity_id` set to
/// `to_primary`.
///
/// Setting a primary clears the flag on every other record. Clearing only
/// touches the target, so the set may end up with no primary at all.
/// An unknown `entity_id` yields an unchanged copy.
pub fn set_primary<E: Clone>(
    set: &[AssociationRecord<E>],
    entity_id: EntityId,
    to_primary: bool,
) -> Vec<AssociationRecord<E>> {
    if !set.iter().any(|r| r.entity_id == entity_id) {
        log::debug!("set_primary: {} not in set, ignoring", entity_id);
        return set.to_vec();
    }

    set.iter()
        .map(|record| {
            let is_primary = if record.entity_id == entity_id {
                to_primary
            } else if to_primary {
                false
            } else {
                record.is_primary
            };
            AssociationRecord {
                is_primary,
                ..record.clone()
            }
        })
        .collect()
}

/// The primary record of a set, if any
pub fn primary_of<E>(set: &[AssociationRecord<E>]) -> Option<&AssociationRecord<E>> {
    set.iter().find(|r| r.is_primary)
}
