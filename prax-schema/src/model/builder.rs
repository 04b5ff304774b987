//! Fluent construction and validation of a [`Model`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use super::{EntityType, Model, Navigation, Property};
use crate::error::{SchemaError, SchemaResult};
use crate::value::Value;

/// Builder for a single entity type.
#[derive(Debug, Clone)]
pub struct EntityTypeBuilder {
    name: SmolStr,
    base_type: Option<SmolStr>,
    collection_name: Option<SmolStr>,
    is_owned: bool,
    properties: Vec<Property>,
    navigations: Vec<Navigation>,
    primary_key: Vec<SmolStr>,
    discriminator: Option<SmolStr>,
    discriminator_value: Option<Value>,
}

impl EntityTypeBuilder {
    /// Start an entity type stored in its own collection.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            base_type: None,
            collection_name: None,
            is_owned: false,
            properties: vec![],
            navigations: vec![],
            primary_key: vec![],
            discriminator: None,
            discriminator_value: None,
        }
    }

    /// Start an owned entity type that only lives embedded in another document.
    pub fn owned(name: impl Into<SmolStr>) -> Self {
        Self {
            is_owned: true,
            ..Self::new(name)
        }
    }

    /// Derive from another entity type.
    pub fn base(mut self, base_type: impl Into<SmolStr>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    /// Set the collection name.
    pub fn collection(mut self, collection_name: impl Into<SmolStr>) -> Self {
        self.collection_name = Some(collection_name.into());
        self
    }

    /// Add a property.
    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Add a navigation.
    pub fn navigation(mut self, navigation: Navigation) -> Self {
        self.navigations.push(navigation);
        self
    }

    /// Set the primary key.
    pub fn key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.primary_key = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the discriminator property and this type's marker value.
    pub fn discriminator(mut self, property: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        self.discriminator = Some(property.into());
        self.discriminator_value = Some(value.into());
        self
    }

    /// Set only this type's marker value, inheriting the discriminator property.
    pub fn discriminator_value(mut self, value: impl Into<Value>) -> Self {
        self.discriminator_value = Some(value.into());
        self
    }
}

/// Builder for a [`Model`].
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    entities: Vec<EntityTypeBuilder>,
}

impl ModelBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity type.
    pub fn entity(mut self, entity: EntityTypeBuilder) -> Self {
        self.entities.push(entity);
        self
    }

    /// Validate and finalize the model.
    pub fn build(self) -> SchemaResult<Model> {
        let mut pending: IndexMap<SmolStr, EntityTypeBuilder> = IndexMap::new();
        for entity in self.entities {
            if pending.contains_key(&entity.name) {
                return Err(SchemaError::duplicate("entity type", entity.name.as_str()));
            }
            pending.insert(entity.name.clone(), entity);
        }

        let ancestors = resolve_ancestors(&pending)?;

        // Bases must be finalized before the types deriving from them.
        let mut order: Vec<&SmolStr> = pending.keys().collect();
        order.sort_by_key(|name| ancestors.get(*name).map_or(0, Vec::len));

        let mut built: HashMap<SmolStr, Arc<EntityType>> = HashMap::new();
        let mut errors = Vec::new();
        for name in order {
            let Some(entity) = pending.get(name) else {
                continue;
            };
            let chain = ancestors.get(name).cloned().unwrap_or_default();
            let base = entity.base_type.as_ref().and_then(|b| built.get(b)).cloned();
            match finalize_entity(entity, chain, base.as_deref()) {
                Ok(e) => {
                    built.insert(name.clone(), Arc::new(e));
                }
                Err(e) => errors.push(e),
            }
        }
        if let Some(err) = SchemaError::from_many(errors) {
            return Err(err);
        }

        let mut errors = Vec::new();
        for entity in built.values() {
            for nav in entity.navigations.values() {
                if nav.declaring_type == entity.name && !pending.contains_key(&nav.target) {
                    errors.push(SchemaError::unknown_type(
                        entity.name.as_str(),
                        nav.target.as_str(),
                    ));
                }
            }
        }
        if let Some(err) = SchemaError::from_many(errors) {
            return Err(err);
        }

        let entities: IndexMap<SmolStr, Arc<EntityType>> = pending
            .keys()
            .filter_map(|name| built.remove(name).map(|e| (name.clone(), e)))
            .collect();

        debug!(entity_count = entities.len(), "Model built");
        Ok(Model { entities })
    }
}

/// Walk each base type chain, rejecting unknown bases and cycles.
fn resolve_ancestors(
    pending: &IndexMap<SmolStr, EntityTypeBuilder>,
) -> SchemaResult<HashMap<SmolStr, Vec<SmolStr>>> {
    let mut result = HashMap::with_capacity(pending.len());
    for (name, entity) in pending {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([name.clone()]);
        let mut current = entity.base_type.clone();
        while let Some(base) = current {
            let Some(base_entity) = pending.get(&base) else {
                return Err(SchemaError::unknown_type(name.as_str(), base.as_str()));
            };
            if !seen.insert(base.clone()) {
                return Err(SchemaError::hierarchy_cycle(name.as_str()));
            }
            current = base_entity.base_type.clone();
            chain.push(base);
        }
        result.insert(name.clone(), chain);
    }
    Ok(result)
}

fn finalize_entity(
    entity: &EntityTypeBuilder,
    ancestors: Vec<SmolStr>,
    base: Option<&EntityType>,
) -> SchemaResult<EntityType> {
    let name = entity.name.as_str();

    let mut properties: IndexMap<SmolStr, Property> = IndexMap::new();
    let mut navigations: IndexMap<SmolStr, Arc<Navigation>> = IndexMap::new();
    if let Some(base) = base {
        for (key, prop) in &base.properties {
            properties.insert(key.clone(), Property::clone(prop));
        }
        navigations.extend(base.navigations.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
    }

    for prop in &entity.properties {
        if properties.contains_key(&prop.name) || navigations.contains_key(&prop.name) {
            return Err(SchemaError::duplicate("member", format!("{name}.{}", prop.name)));
        }
        let mut prop = prop.clone();
        prop.declaring_type = entity.name.clone();
        properties.insert(prop.name.clone(), prop);
    }
    for nav in &entity.navigations {
        if properties.contains_key(&nav.name) || navigations.contains_key(&nav.name) {
            return Err(SchemaError::duplicate("member", format!("{name}.{}", nav.name)));
        }
        let mut nav = nav.clone();
        nav.declaring_type = entity.name.clone();
        navigations.insert(nav.name.clone(), Arc::new(nav));
    }

    let primary_key = if entity.primary_key.is_empty() {
        base.map(|b| b.primary_key.clone()).unwrap_or_default()
    } else {
        entity.primary_key.clone()
    };
    let composite = primary_key.len() > 1;
    for prop in properties.values_mut() {
        prop.is_key = false;
        prop.in_composite_key = false;
    }
    for key in &primary_key {
        let Some(prop) = properties.get_mut(key) else {
            return Err(SchemaError::invalid_property(
                name,
                key.as_str(),
                "key property not found",
            ));
        };
        prop.is_key = true;
        prop.in_composite_key = composite;
    }

    check_element_names(name, &properties, &navigations)?;

    let discriminator = entity
        .discriminator
        .clone()
        .or_else(|| base.and_then(|b| b.discriminator.clone()));
    if let Some(disc) = &discriminator {
        if !properties.contains_key(disc) {
            return Err(SchemaError::invalid_property(
                name,
                disc.as_str(),
                "discriminator property not found",
            ));
        }
    }

    Ok(EntityType {
        name: entity.name.clone(),
        base_type: entity.base_type.clone(),
        ancestors,
        collection_name: entity
            .collection_name
            .clone()
            .or_else(|| base.and_then(|b| b.collection_name.clone())),
        is_owned: entity.is_owned,
        properties: properties
            .into_iter()
            .map(|(k, v)| (k, Arc::new(v)))
            .collect(),
        navigations,
        primary_key,
        discriminator,
        discriminator_value: entity.discriminator_value.clone(),
    })
}

/// Element names must be unique within one nesting level.
fn check_element_names(
    entity: &str,
    properties: &IndexMap<SmolStr, Property>,
    navigations: &IndexMap<SmolStr, Arc<Navigation>>,
) -> SchemaResult<()> {
    let mut top_level = HashSet::new();
    let mut in_id = HashSet::new();

    for prop in properties.values().filter(|p| p.is_stored()) {
        let level = if prop.in_composite_key {
            &mut in_id
        } else {
            &mut top_level
        };
        if !level.insert(prop.element_name.clone()) {
            return Err(SchemaError::duplicate(
                "element name",
                format!("{entity}.{}", prop.element_name),
            ));
        }
    }
    if !in_id.is_empty() && top_level.contains(super::ID_ELEMENT) {
        return Err(SchemaError::duplicate(
            "element name",
            format!("{entity}.{}", super::ID_ELEMENT),
        ));
    }

    for element in navigations.values().filter_map(|n| n.element_name.as_ref()) {
        if !top_level.insert(element.clone()) {
            return Err(SchemaError::duplicate(
                "element name",
                format!("{entity}.{element}"),
            ));
        }
    }
    Ok(())
}
