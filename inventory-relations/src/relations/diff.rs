//! Diff engine for relation sets.
//!
//! Compares the persisted baseline of a relation set against the edited set
//! and sorts every catalog entity into exactly one of:
//! - add (only in the edited set)
//! - delete (only in the baseline)
//! - update (in both, primary flag changed)
//!
//! Entities present in both with the same flag produce nothing. A baseline
//! holding the same entity more than once keeps its first record; the others
//! are deleted.

use std::collections::{HashMap, HashSet};

use crate::models::{AssociationRecord, EntityId};

/// What needs to change remotely to turn `original` into `current`
#[derive(Clone, Debug, PartialEq)]
pub struct RelationDiff<E> {
    /// Records to create (taken from `current`)
    pub to_add: Vec<AssociationRecord<E>>,
    /// Records to delete (taken from `original`, carrying the persisted id)
    pub to_delete: Vec<AssociationRecord<E>>,
    /// Records whose primary flag changed: the `current` record with the
    /// `original` record's id
    pub to_update: Vec<AssociationRecord<E>>,
}

impl<E> Default for RelationDiff<E> {
    fn default() -> Self {
        Self {
            to_add: Vec::new(),
            to_delete: Vec::new(),
            to_update: Vec::new(),
        }
    }
}

impl<E> RelationDiff<E> {
    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        !self.to_add.is_empty() || !self.to_delete.is_empty() || !self.to_update.is_empty()
    }

    /// Number of remote calls needed to apply this diff
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_delete.len() + self.to_update.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }
}

/// Diff a relation set's baseline against its edited state.
///
/// Matching is by `entity_id` only; record ids and display payloads are
/// ignored. Runs in O(n + m). Neither input is modified.
pub fn diff<E: Clone>(
    original: &[AssociationRecord<E>],
    current: &[AssociationRecord<E>],
) -> RelationDiff<E> {
    let mut baseline: HashMap<EntityId, &AssociationRecord<E>> =
        HashMap::with_capacity(original.len());
    for record in original {
        baseline.entry(record.entity_id).or_insert(record);
    }
    let mut seen: HashSet<EntityId> = HashSet::with_capacity(current.len());
    let mut result = RelationDiff::default();

    for record in current {
        if !seen.insert(record.entity_id) {
            log::debug!(
                "Duplicate {} in edited set, keeping first occurrence",
                record.entity_id
            );
            continue;
        }

        match baseline.get(&record.entity_id) {
            None => result.to_add.push(record.clone()),
            Some(previous) if previous.is_primary != record.is_primary => {
                log::debug!(
                    "{} primary changed: {} -> {}",
                    record.entity_id,
                    previous.is_primary,
                    record.is_primary
                );
                result.to_update.push(AssociationRecord {
                    id: previous.id,
                    owner_id: previous.owner_id,
                    ..record.clone()
                });
            }
            Some(_) => {}
        }
    }

    let mut first_seen: HashSet<EntityId> = HashSet::with_capacity(original.len());
    for record in original {
        let first = first_seen.insert(record.entity_id);
        if !first {
            log::debug!("Duplicate {} in baseline, deleting {}", record.entity_id, record.id);
        }
        if !first || !seen.contains(&record.entity_id) {
            result.to_delete.push(record.clone());
        }
    }

    log::debug!(
        "Relation diff: {} add, {} delete, {} update",
        result.to_add.len(),
        result.to_delete.len(),
        result.to_update.len()
    );

    result
}
