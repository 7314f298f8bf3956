//! Catalog entities that inventory items can be associated with

use serde::{Deserialize, Serialize};

use super::EntityId;

/// A catalog entity that can appear in an item's relation set
pub trait CatalogEntity {
    fn entity_id(&self) -> EntityId;

    /// Text shown in the editor's lists
    fn label(&self) -> &str;
}

/// Catalog color
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub id: EntityId,
    pub name: String,
    /// Hex code, e.g. "#ff0000"
    pub hex: String,
}

impl Color {
    pub fn new(id: EntityId, name: impl Into<String>, hex: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            hex: hex.into(),
        }
    }
}

impl CatalogEntity for Color {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// Catalog material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: EntityId,
    pub name: String,
}

impl Material {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl CatalogEntity for Material {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}
