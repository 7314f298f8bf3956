//! Relation-set reconciliation core of the inventory admin console.
//!
//! An item's colors and materials are edited as a [`RelationSet`]: the
//! persisted baseline plus a working copy the editor mutates. Committing
//! diffs the two and replays the difference against a [`RelationStore`],
//! which only knows how to create, update and delete a single record.
//!
//! ```text
//! let executor = SyncExecutor::with_config(store, SyncConfig::load()?);
//! let mut colors = ItemColors::new(item_id, loaded_records);
//! colors.add_entity(&red);
//! colors.set_primary(red.id, true);
//! colors.commit(&executor).await?;
//! ```

pub mod config;
pub mod logging;
pub mod models;
pub mod relations;
pub mod store;

pub use config::{LogLevel, SyncConfig, SyncConfigBuilder};
pub use models::{
    AssociationRecord, CatalogEntity, Color, EntityId, ItemId, Material, RecordId, RemoteId,
};
pub use relations::{
    Bucket, ItemColors, ItemMaterials, PartialSyncError, RelationDiff, RelationOperation,
    RelationSet, SyncError, SyncExecutor, SyncFailure, SyncOutcome, SyncReport,
};
pub use store::{MemoryRelationStore, RelationStore, StoreError};
