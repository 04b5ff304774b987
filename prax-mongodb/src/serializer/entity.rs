//! Entity serializers and their per-model cache.

use std::collections::HashMap;
use std::sync::Arc;

use bson::Bson;
use indexmap::IndexMap;
use parking_lot::RwLock;
use prax_schema::{EntityType, Model, Navigation, Property, TypeDescriptor, Value};
use smol_str::SmolStr;
use tracing::{debug, trace};

use super::composite::{ArraySerializer, CollectionSerializer, NullableSerializer};
use super::resolver::TypeSerializerResolver;
use super::{BsonSerializer, CacheStats, SerializationInfo, SharedSerializer};
use crate::error::{MongoError, MongoResult};

/// Resolves where each member of one entity type is stored.
///
/// Entities are never serialized as a whole: [`BsonSerializer::serialize`] and
/// [`BsonSerializer::deserialize`] fail with [`MongoError::UnsupportedComparison`]
/// so that predicates compare by key or by field instead.
#[derive(Debug)]
pub struct EntitySerializer {
    entity: Arc<EntityType>,
    value_type: TypeDescriptor,
    members: IndexMap<SmolStr, SerializationInfo>,
    height: usize,
    deepest: SmolStr,
}

impl EntitySerializer {
    /// The entity type.
    pub fn entity(&self) -> &Arc<EntityType> {
        &self.entity
    }

    /// Number of entity levels stored under this type, itself included.
    pub fn embedding_height(&self) -> usize {
        self.height
    }

    /// Resolve a property or navigation by name.
    pub fn try_resolve_member(&self, name: &str) -> Option<&SerializationInfo> {
        self.members.get(name)
    }

    /// All stored members, properties first.
    pub fn members(&self) -> impl Iterator<Item = (&SmolStr, &SerializationInfo)> {
        self.members.iter()
    }

    fn unsupported_comparison(&self) -> MongoError {
        MongoError::unsupported_comparison(
            self.entity.name.as_str(),
            self.entity.stored_key_names().iter().map(|k| k.to_string()),
        )
    }
}

impl BsonSerializer for EntitySerializer {
    fn value_type(&self) -> &TypeDescriptor {
        &self.value_type
    }

    fn serialize(&self, _value: &Value) -> MongoResult<Bson> {
        Err(self.unsupported_comparison())
    }

    fn deserialize(&self, _bson: &Bson) -> MongoResult<Value> {
        Err(self.unsupported_comparison())
    }

    fn try_member_info(&self, name: &str) -> Option<SerializationInfo> {
        self.try_resolve_member(name).cloned()
    }
}

/// Builds and memoizes [`EntitySerializer`]s for the entity types of one model.
///
/// Navigations to embedded types recurse into the same cache. Entries live as
/// long as the cache and are never evicted.
#[derive(Debug)]
pub struct EntitySerializerCache {
    model: Arc<Model>,
    resolver: Arc<TypeSerializerResolver>,
    cache: RwLock<HashMap<SmolStr, Arc<EntitySerializer>>>,
    stats: RwLock<CacheStats>,
}

impl EntitySerializerCache {
    /// Create a cache for a model.
    pub fn new(model: Arc<Model>, resolver: Arc<TypeSerializerResolver>) -> Self {
        Self {
            model,
            resolver,
            cache: RwLock::default(),
            stats: RwLock::default(),
        }
    }

    /// The model.
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// The serializer resolver used for properties.
    pub fn resolver(&self) -> &Arc<TypeSerializerResolver> {
        &self.resolver
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = *self.stats.read();
        stats.cached_count = self.cache.read().len();
        stats
    }

    /// Get the serializer for an entity type.
    pub fn get(&self, entity: &str) -> MongoResult<Arc<EntitySerializer>> {
        self.get_at_depth(entity, 0)
    }

    fn get_at_depth(&self, entity: &str, depth: usize) -> MongoResult<Arc<EntitySerializer>> {
        let max_depth = self.resolver.config().max_embedding_depth;

        let cached = self.cache.read().get(entity).cloned();
        if let Some(serializer) = cached {
            self.stats.write().hits += 1;
            trace!(entity = %entity, "Entity serializer cache hit");
            // A cached subtree must still fit below the depth it is reached at.
            if depth + serializer.height > max_depth {
                return Err(too_deep(&serializer.deepest, max_depth));
            }
            return Ok(serializer);
        }

        if depth >= max_depth {
            return Err(too_deep(entity, max_depth));
        }

        let entity_type = self.model.entity(entity).ok_or_else(|| {
            MongoError::config(format!("entity type `{entity}` is not part of the model"))
        })?;
        let built = Arc::new(self.build(entity_type, depth)?);
        let member_count = built.members.len();

        let serializer = {
            let mut cache = self.cache.write();
            Arc::clone(cache.entry(entity_type.name.clone()).or_insert(built))
        };
        self.stats.write().misses += 1;
        debug!(entity = %entity, members = member_count, "Entity serializer created");
        Ok(serializer)
    }

    fn build(&self, entity: &Arc<EntityType>, depth: usize) -> MongoResult<EntitySerializer> {
        let mut members = IndexMap::new();
        for property in entity.stored_properties() {
            members.insert(property.name.clone(), self.property_info(property)?);
        }

        let mut height = 1;
        let mut deepest = entity.name.clone();
        for navigation in entity.embedded_navigations() {
            if let Some((info, target)) = self.navigation_info(navigation, depth)? {
                if target.height + 1 > height {
                    height = target.height + 1;
                    deepest = target.deepest.clone();
                }
                members.insert(navigation.name.clone(), info);
            }
        }

        Ok(EntitySerializer {
            entity: Arc::clone(entity),
            value_type: TypeDescriptor::Entity(entity.name.clone()),
            members,
            height,
            deepest,
        })
    }

    fn property_info(&self, property: &Property) -> MongoResult<SerializationInfo> {
        Ok(SerializationInfo::new(
            property.stored_path(),
            self.resolver.resolve_for_property(property)?,
            property.type_descriptor.clone(),
        ))
    }

    fn navigation_info(
        &self,
        navigation: &Navigation,
        depth: usize,
    ) -> MongoResult<Option<(SerializationInfo, Arc<EntitySerializer>)>> {
        let Some(element) = &navigation.element_name else {
            return Ok(None);
        };
        let target = self.get_at_depth(&navigation.target, depth + 1)?;
        let shared: SharedSerializer = Arc::clone(&target) as SharedSerializer;
        let serializer: SharedSerializer = match &navigation.collection {
            Some(kind) => Arc::new(CollectionSerializer::new(kind.clone(), shared)),
            None if navigation.is_required => shared,
            None => Arc::new(NullableSerializer::new(shared)),
        };
        let info = SerializationInfo::new(
            vec![element.clone()],
            serializer,
            navigation.type_descriptor(),
        );
        Ok(Some((info, target)))
    }

    /// Resolve a serializer for a type that may reference entity types.
    ///
    /// Entity references resolve through this cache, wrapped in whatever nullable,
    /// array or collection shape surrounds them. Everything else goes to the
    /// type serializer resolver.
    pub fn resolve_type(&self, ty: &TypeDescriptor) -> MongoResult<SharedSerializer> {
        if !references_entity(ty) {
            return self.resolver.resolve(ty);
        }
        Ok(match ty {
            TypeDescriptor::Entity(name) => self.get(name)?,
            TypeDescriptor::Nullable(inner) => {
                Arc::new(NullableSerializer::new(self.resolve_type(inner)?))
            }
            TypeDescriptor::Array { element, rank: 1 } => {
                Arc::new(ArraySerializer::new(self.resolve_type(element)?))
            }
            TypeDescriptor::Collection { kind, element } => {
                Arc::new(CollectionSerializer::new(kind.clone(), self.resolve_type(element)?))
            }
            other => return Err(MongoError::unsupported_type(other)),
        })
    }
}

fn too_deep(entity: &str, max_depth: usize) -> MongoError {
    MongoError::config(format!(
        "embedded entity type `{entity}` is nested more than {max_depth} levels deep"
    ))
}

fn references_entity(ty: &TypeDescriptor) -> bool {
    match ty {
        TypeDescriptor::Entity(_) => true,
        TypeDescriptor::Nullable(inner) => references_entity(inner),
        TypeDescriptor::Array { element, .. } | TypeDescriptor::Collection { element, .. } => {
            references_entity(element)
        }
        TypeDescriptor::Dictionary { value, .. } => references_entity(value),
        _ => false,
    }
}
