//! In-memory Relation Store
//!
//! Keeps association rows in a map and records every call it receives.
//! Failures can be injected per entity (creates) or per remote id (deletes,
//! updates) so the executor's partial-failure paths can be driven directly.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

use super::{RelationStore, StoreError};
use crate::models::{AssociationRecord, EntityId, ItemId, RecordId, RemoteId};

/// A call received by the store, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create {
        owner_id: ItemId,
        entity_id: EntityId,
        is_primary: bool,
    },
    Delete {
        id: RemoteId,
    },
    Update {
        id: RemoteId,
        is_primary: bool,
    },
}

#[derive(Debug, Clone)]
struct StoredRow {
    owner_id: ItemId,
    entity_id: EntityId,
    is_primary: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: RemoteId,
    rows: BTreeMap<RemoteId, StoredRow>,
    calls: Vec<StoreCall>,
    create_failures: HashMap<EntityId, StoreError>,
    delete_failures: HashMap<RemoteId, StoreError>,
    update_failures: HashMap<RemoteId, StoreError>,
    malformed_creates: HashSet<EntityId>,
}

/// Relation Store backed by process memory
#[derive(Debug)]
pub struct MemoryRelationStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryRelationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRelationStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Insert a row directly, bypassing the call log
    pub async fn seed<E>(
        &self,
        owner_id: ItemId,
        entity_id: EntityId,
        is_primary: bool,
    ) -> AssociationRecord<E> {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.rows.insert(
            id,
            StoredRow {
                owner_id,
                entity_id,
                is_primary,
            },
        );
        AssociationRecord::persisted(id, owner_id, entity_id, is_primary)
    }

    /// All rows belonging to `owner_id`, ordered by remote id
    pub async fn records_for<E>(&self, owner_id: ItemId) -> Vec<AssociationRecord<E>> {
        let state = self.state.lock().await;
        state
            .rows
            .iter()
            .filter(|(_, row)| row.owner_id == owner_id)
            .map(|(id, row)| {
                AssociationRecord::persisted(*id, row.owner_id, row.entity_id, row.is_primary)
            })
            .collect()
    }

    /// Calls received so far
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Make every create for `entity_id` fail with `error`
    pub async fn fail_create(&self, entity_id: EntityId, error: StoreError) {
        self.state.lock().await.create_failures.insert(entity_id, error);
    }

    /// Make every delete of remote id `id` fail with `error`
    pub async fn fail_delete(&self, id: RemoteId, error: StoreError) {
        self.state.lock().await.delete_failures.insert(id, error);
    }

    /// Make every update of remote id `id` fail with `error`
    pub async fn fail_update(&self, id: RemoteId, error: StoreError) {
        self.state.lock().await.update_failures.insert(id, error);
    }

    /// Answer creates for `entity_id` with a record that has no persisted id
    pub async fn malform_create(&self, entity_id: EntityId) {
        self.state.lock().await.malformed_creates.insert(entity_id);
    }

    /// Drop all injected failures
    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.create_failures.clear();
        state.delete_failures.clear();
        state.update_failures.clear();
        state.malformed_creates.clear();
    }
}

impl MemoryState {
    fn allocate_id(&mut self) -> RemoteId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[async_trait]
impl<E> RelationStore<E> for MemoryRelationStore
where
    E: Send + 'static,
{
    async fn create(
        &self,
        owner_id: ItemId,
        entity_id: EntityId,
        is_primary: bool,
    ) -> Result<AssociationRecord<E>, StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Create {
            owner_id,
            entity_id,
            is_primary,
        });

        if let Some(error) = state.create_failures.get(&entity_id) {
            return Err(error.clone());
        }

        if state.malformed_creates.contains(&entity_id) {
            let mut record = AssociationRecord::draft(entity_id, is_primary);
            record.owner_id = Some(owner_id);
            return Ok(record);
        }

        let duplicate = state
            .rows
            .values()
            .any(|row| row.owner_id == owner_id && row.entity_id == entity_id);
        if duplicate {
            return Err(StoreError::Validation(format!(
                "{} is already linked to {}",
                entity_id, owner_id
            )));
        }

        let id = state.allocate_id();
        state.rows.insert(
            id,
            StoredRow {
                owner_id,
                entity_id,
                is_primary,
            },
        );
        Ok(AssociationRecord {
            id: RecordId::Persisted(id),
            owner_id: Some(owner_id),
            entity_id,
            is_primary,
            entity: None,
        })
    }

    async fn delete_by_id(&self, id: RemoteId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Delete { id });

        if let Some(error) = state.delete_failures.get(&id) {
            return Err(error.clone());
        }

        match state.rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound { id }),
        }
    }

    async fn update_by_id(
        &self,
        id: RemoteId,
        is_primary: bool,
    ) -> Result<AssociationRecord<E>, StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Update { id, is_primary });

        if let Some(error) = state.update_failures.get(&id) {
            return Err(error.clone());
        }

        let row = state.rows.get_mut(&id).ok_or(StoreError::NotFound { id })?;
        row.is_primary = is_primary;
        Ok(AssociationRecord::persisted(id, row.owner_id, row.entity_id, row.is_primary))
    }
}
