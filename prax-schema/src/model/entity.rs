//! Finalized entity types.

use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::{Navigation, Property};
use crate::value::Value;

/// A mapped entity type with inherited members flattened in.
#[derive(Debug, Clone)]
pub struct EntityType {
    /// Entity type name.
    pub name: SmolStr,
    /// Direct base type.
    pub base_type: Option<SmolStr>,
    /// All base types, nearest first.
    pub ancestors: Vec<SmolStr>,
    /// Collection the root of the hierarchy is stored in.
    pub collection_name: Option<SmolStr>,
    /// Whether instances live only inside an owner's document.
    pub is_owned: bool,
    /// Properties, inherited ones first.
    pub properties: IndexMap<SmolStr, Arc<Property>>,
    /// Navigations, inherited ones first.
    pub navigations: IndexMap<SmolStr, Arc<Navigation>>,
    /// Primary key property names, in key order.
    pub primary_key: Vec<SmolStr>,
    /// Property holding the concrete type marker.
    pub discriminator: Option<SmolStr>,
    /// Marker value identifying this concrete type.
    pub discriminator_value: Option<Value>,
}

impl EntityType {
    /// Look up a property by name.
    pub fn find_property(&self, name: &str) -> Option<&Arc<Property>> {
        self.properties.get(name)
    }

    /// Look up a navigation by name.
    pub fn find_navigation(&self, name: &str) -> Option<&Arc<Navigation>> {
        self.navigations.get(name)
    }

    /// Properties declared on this type, excluding inherited ones.
    pub fn declared_properties(&self) -> impl Iterator<Item = &Arc<Property>> {
        self.properties
            .values()
            .filter(move |p| p.declaring_type == self.name)
    }

    /// Properties written to the document.
    pub fn stored_properties(&self) -> impl Iterator<Item = &Arc<Property>> {
        self.properties.values().filter(|p| p.is_stored())
    }

    /// Navigations whose targets are embedded in this type's document.
    pub fn embedded_navigations(&self) -> impl Iterator<Item = &Arc<Navigation>> {
        self.navigations.values().filter(|n| n.is_embedded())
    }

    /// Key properties, in key order.
    pub fn key_properties(&self) -> impl Iterator<Item = &Arc<Property>> {
        self.primary_key
            .iter()
            .filter_map(|name| self.properties.get(name))
    }

    /// Element names of the stored key properties.
    pub fn stored_key_names(&self) -> Vec<SmolStr> {
        self.key_properties()
            .filter(|p| p.is_stored())
            .map(|p| p.element_name.clone())
            .collect()
    }

    /// Check if the primary key spans more than one property.
    pub fn has_composite_key(&self) -> bool {
        self.primary_key.len() > 1
    }

    /// The root of the inheritance hierarchy.
    pub fn root_type(&self) -> &str {
        self.ancestors.last().unwrap_or(&self.name)
    }

    /// Check if a value of `other` can be used where this type is expected.
    pub fn is_assignable_from(&self, other: &EntityType) -> bool {
        self.name == other.name || other.ancestors.contains(&self.name)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
