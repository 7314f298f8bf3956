//! Relation Store port
//!
//! The remote endpoint exposes one resource per association record and only
//! supports create, update and delete of a single record. There is no bulk or
//! transactional variant, so every reconciliation step is its own call.

pub mod memory;

pub use memory::{MemoryRelationStore, StoreCall};

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{AssociationRecord, EntityId, ItemId, RemoteId};

/// Per-record CRUD endpoint for association records
///
/// Implementations own transport concerns (timeouts, retries, auth). Every
/// failure they surface is treated as a failure of that single call.
#[async_trait]
pub trait RelationStore<E>: Send + Sync
where
    E: Send + 'static,
{
    /// Create a link between `owner_id` and `entity_id`
    async fn create(
        &self,
        owner_id: ItemId,
        entity_id: EntityId,
        is_primary: bool,
    ) -> Result<AssociationRecord<E>, StoreError>;

    /// Delete the record with the given remote id
    async fn delete_by_id(&self, id: RemoteId) -> Result<(), StoreError>;

    /// Set the primary flag of the record with the given remote id
    async fn update_by_id(
        &self,
        id: RemoteId,
        is_primary: bool,
    ) -> Result<AssociationRecord<E>, StoreError>;
}

#[async_trait]
impl<E, S> RelationStore<E> for Arc<S>
where
    E: Send + 'static,
    S: RelationStore<E> + ?Sized,
{
    async fn create(
        &self,
        owner_id: ItemId,
        entity_id: EntityId,
        is_primary: bool,
    ) -> Result<AssociationRecord<E>, StoreError> {
        (**self).create(owner_id, entity_id, is_primary).await
    }

    async fn delete_by_id(&self, id: RemoteId) -> Result<(), StoreError> {
        (**self).delete_by_id(id).await
    }

    async fn update_by_id(
        &self,
        id: RemoteId,
        is_primary: bool,
    ) -> Result<AssociationRecord<E>, StoreError> {
        (**self).update_by_id(id, is_primary).await
    }
}

/// Failure of a single Relation Store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport failure, timeout, or 5xx
    Network(String),
    /// The addressed record does not exist
    NotFound { id: RemoteId },
    /// The store rejected the payload
    Validation(String),
    /// The store answered with data that does not match the request
    Malformed(String),
}

impl StoreError {
    /// Whether this error means the store itself cannot be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Malformed(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Network(_) => "network",
            StoreError::NotFound { .. } => "not_found",
            StoreError::Validation(_) => "validation",
            StoreError::Malformed(_) => "malformed",
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Network(msg) => write!(f, "network error: {}", msg),
            StoreError::NotFound { id } => write!(f, "record {} not found", id),
            StoreError::Validation(msg) => write!(f, "validation failed: {}", msg),
            StoreError::Malformed(msg) => write!(f, "malformed store response: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_malformed_is_fatal() {
        assert!(StoreError::Malformed("bad id".into()).is_fatal());
        assert!(!StoreError::Network("timeout".into()).is_fatal());
        assert!(!StoreError::NotFound { id: 3 }.is_fatal());
        assert!(!StoreError::Validation("duplicate".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        assert_eq!(StoreError::NotFound { id: 9 }.to_string(), "record 9 not found");
        assert_eq!(
            StoreError::Network("connection reset".into()).to_string(),
            "network error: connection reset"
        );
    }
}
