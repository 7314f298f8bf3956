//! Editing session for one item's relation set
//!
//! Holds the persisted baseline (`original`) and the user's working copy
//! (`current`). Editor actions only touch `current`; `commit` pushes the
//! difference to the store and moves the baseline forward.

use std::collections::{HashMap, HashSet};

use super::diff::{RelationDiff, diff};
use super::error::SyncError;
use super::primary::{primary_of, set_primary};
use super::report::SyncReport;
use super::sync::SyncExecutor;
use crate::models::{AssociationRecord, CatalogEntity, EntityId, ItemId};
use crate::store::RelationStore;

#[derive(Debug, Clone)]
pub struct RelationSet<E> {
    owner_id: Option<ItemId>,
    original: Vec<AssociationRecord<E>>,
    current: Vec<AssociationRecord<E>>,
}

impl<E: Clone> RelationSet<E> {
    /// Start a session for an existing item with its persisted records.
    ///
    /// The working copy holds each entity once. Extra records for an entity
    /// stay in the baseline so the next commit deletes them.
    pub fn new(owner_id: ItemId, records: Vec<AssociationRecord<E>>) -> Self {
        let current = first_per_entity(&records);
        if current.len() != records.len() {
            log::warn!(
                "{} has {} duplicate relation records",
                owner_id,
                records.len() - current.len()
            );
        }
        Self {
            owner_id: Some(owner_id),
            original: records,
            current,
        }
    }

    /// Start a session with nothing persisted yet (e.g. a new item)
    pub fn empty(owner_id: Option<ItemId>) -> Self {
        Self {
            owner_id,
            original: Vec::new(),
            current: Vec::new(),
        }
    }

    pub fn owner_id(&self) -> Option<ItemId> {
        self.owner_id
    }

    /// Attach the session to its item once the item has been created
    pub fn set_owner(&mut self, owner_id: ItemId) {
        self.owner_id = Some(owner_id);
        for record in self.current.iter_mut().chain(self.original.iter_mut()) {
            record.owner_id = Some(owner_id);
        }
    }

    /// Last confirmed persisted state
    pub fn original(&self) -> &[AssociationRecord<E>] {
        &self.original
    }

    /// Working copy in display order
    pub fn current(&self) -> &[AssociationRecord<E>] {
        &self.current
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.current.iter().any(|r| r.entity_id == entity_id)
    }

    pub fn primary(&self) -> Option<&AssociationRecord<E>> {
        primary_of(&self.current)
    }

    /// Append a record. Returns false (and changes nothing) if its entity is
    /// already in the set.
    ///
    /// An entity that is still in the baseline gets its persisted id back, so
    /// removing and re-adding it costs no store call.
    pub fn add(&mut self, record: AssociationRecord<E>) -> bool {
        if self.contains(record.entity_id) {
            log::debug!("{} already in relation set, ignoring add", record.entity_id);
            return false;
        }

        let entity_id = record.entity_id;
        let is_primary = record.is_primary;
        let record = match self.original.iter().find(|r| r.entity_id == entity_id) {
            Some(previous) => AssociationRecord {
                id: previous.id,
                owner_id: previous.owner_id,
                ..record
            },
            None => AssociationRecord {
                owner_id: self.owner_id,
                ..record
            },
        };
        self.current.push(record);

        if is_primary {
            self.current = set_primary(&self.current, entity_id, true);
        }
        true
    }

    /// Remove an entity from the set. Returns false if it was not there.
    pub fn remove(&mut self, entity_id: EntityId) -> bool {
        let before = self.current.len();
        self.current.retain(|r| r.entity_id != entity_id);
        before != self.current.len()
    }

    /// Set or clear the primary flag. Returns false for an unknown entity.
    pub fn set_primary(&mut self, entity_id: EntityId, to_primary: bool) -> bool {
        if !self.contains(entity_id) {
            log::debug!("{} not in relation set, ignoring primary change", entity_id);
            return false;
        }
        self.current = set_primary(&self.current, entity_id, to_primary);
        true
    }

    /// Move the record at `from` to position `to`. Out-of-range positions
    /// are ignored.
    pub fn move_record(&mut self, from: usize, to: usize) -> bool {
        if from >= self.current.len() || to >= self.current.len() {
            return false;
        }
        let record = self.current.remove(from);
        self.current.insert(to, record);
        true
    }

    /// Changes needed to persist the working copy
    pub fn pending_diff(&self) -> RelationDiff<E> {
        diff(&self.original, &self.current)
    }

    /// Whether the working copy differs from the baseline (order aside)
    pub fn is_dirty(&self) -> bool {
        self.pending_diff().has_changes()
    }

    /// Discard unsaved edits
    pub fn reset(&mut self) {
        self.current = first_per_entity(&self.original);
    }

    /// Push pending edits to the store.
    ///
    /// On success both sets become the synced state. On a partial or fatal
    /// failure the baseline moves forward by the calls that went through,
    /// and the working copy keeps the user's edits (with server ids adopted
    /// for records that were created), so committing again retries only
    /// what failed. Without an owner nothing is sent.
    pub async fn commit<S>(
        &mut self,
        executor: &SyncExecutor<S>,
    ) -> Result<SyncReport, SyncError<E>>
    where
        E: Send + Sync + 'static,
        S: RelationStore<E>,
    {
        let owner_id = self.owner_id.ok_or(SyncError::MissingOwner)?;

        match executor.sync(owner_id, &self.original, &self.current).await {
            Ok(outcome) => {
                self.current = outcome.baseline.clone();
                self.original = outcome.baseline;
                Ok(outcome.report)
            }
            Err(err) => {
                if let Some(baseline) = err.baseline() {
                    self.original = baseline.to_vec();
                    self.adopt_persisted_ids();
                }
                Err(err)
            }
        }
    }

    fn adopt_persisted_ids(&mut self) {
        let persisted: HashMap<EntityId, &AssociationRecord<E>> = self
            .original
            .iter()
            .filter(|r| !r.id.is_draft())
            .map(|r| (r.entity_id, r))
            .collect();

        for record in self.current.iter_mut().filter(|r| r.id.is_draft()) {
            if let Some(previous) = persisted.get(&record.entity_id) {
                record.id = previous.id;
                record.owner_id = previous.owner_id;
            }
        }
    }
}

fn first_per_entity<E: Clone>(records: &[AssociationRecord<E>]) -> Vec<AssociationRecord<E>> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|r| seen.insert(r.entity_id))
        .cloned()
        .collect()
}

impl<E: CatalogEntity + Clone> RelationSet<E> {
    /// Add a catalog entity dragged in from the available pool
    pub fn add_entity(&mut self, entity: &E) -> bool {
        self.add(AssociationRecord::from_entity(entity))
    }

    /// Catalog entities not yet in the set, in catalog order
    pub fn available<'a>(&self, catalog: &'a [E]) -> Vec<&'a E> {
        catalog
            .iter()
            .filter(|entity| !self.contains(entity.entity_id()))
            .collect()
    }
}
