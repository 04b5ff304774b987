//! The finalized mapping model.
//!
//! A [`Model`] is the immutable output of model building: every entity type
//! with its inherited members flattened in, keys resolved, and element names
//! checked for collisions. Serializers and query expressions only ever read it.

mod builder;
mod entity;
mod navigation;
mod property;

use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

pub use builder::{EntityTypeBuilder, ModelBuilder};
pub use entity::EntityType;
pub use navigation::Navigation;
pub use property::{ID_ELEMENT, Property};

/// A finalized set of entity types.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Entity types by name, in declaration order.
    pub entities: IndexMap<SmolStr, Arc<EntityType>>,
}

impl Model {
    /// Start building a model.
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    /// Look up an entity type by name.
    pub fn entity(&self, name: &str) -> Option<&Arc<EntityType>> {
        self.entities.get(name)
    }

    /// Check if values of `derived` can be used where `base` is expected.
    ///
    /// Unknown names are never assignable.
    pub fn is_assignable_from(&self, base: &str, derived: &str) -> bool {
        match (self.entity(base), self.entity(derived)) {
            (Some(base), Some(derived)) => base.is_assignable_from(derived),
            _ => false,
        }
    }

    /// Entity types deriving from `name`, directly or indirectly.
    pub fn derived_types<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<EntityType>> {
        self.entities
            .values()
            .filter(move |e| e.ancestors.iter().any(|a| a == name))
    }

    /// Entity types stored in their own collection.
    pub fn root_entities(&self) -> impl Iterator<Item = &Arc<EntityType>> {
        self.entities
            .values()
            .filter(|e| !e.is_owned && e.base_type.is_none())
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let properties: usize = self.entities.values().map(|e| e.properties.len()).sum();
        let navigations: usize = self.entities.values().map(|e| e.navigations.len()).sum();
        write!(
            f,
            "Model({} entity types, {} properties, {} navigations)",
            self.entities.len(),
            properties,
            navigations
        )
    }
}
