//! Domain types shared by the relation editor and the sync executor

mod catalog;
mod record;

pub use catalog::{CatalogEntity, Color, Material};
pub use record::{AssociationRecord, EntityId, ItemId, RecordId, RemoteId};
