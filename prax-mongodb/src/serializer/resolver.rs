//! Type serializer resolution.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use prax_schema::{Property, TypeDescriptor, WireRepresentation};
use tracing::{debug, trace};

use super::composite::{
    ArraySerializer, ClassMapSerializer, CollectionSerializer, DictionarySerializer,
    NullableSerializer, RawDocumentSerializer,
};
use super::converter::ValueConverterSerializer;
use super::scalar::ScalarSerializer;
use super::{CacheStats, SharedSerializer};
use crate::config::MappingConfig;
use crate::error::{MongoError, MongoResult};

/// Maps type descriptors to serializers.
///
/// Resolution dispatches on the shape of the descriptor. Results for plain
/// descriptors are memoized; the cache can be populated from many threads at
/// once, and when two threads race to build the same entry the first insert wins.
#[derive(Debug, Default)]
pub struct TypeSerializerResolver {
    config: MappingConfig,
    cache: RwLock<HashMap<TypeDescriptor, SharedSerializer>>,
    stats: RwLock<CacheStats>,
}

impl TypeSerializerResolver {
    /// Create a resolver with the given configuration.
    pub fn new(config: MappingConfig) -> Self {
        Self {
            config,
            cache: RwLock::default(),
            stats: RwLock::default(),
        }
    }

    /// The mapping configuration.
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = *self.stats.read();
        stats.cached_count = self.cache.read().len();
        stats
    }

    /// Resolve the serializer for a type.
    pub fn resolve(&self, ty: &TypeDescriptor) -> MongoResult<SharedSerializer> {
        if let Some(serializer) = self.cache.read().get(ty) {
            self.stats.write().hits += 1;
            trace!(type_name = %ty, "Serializer cache hit");
            return Ok(Arc::clone(serializer));
        }

        let built = self.build(ty)?;
        let serializer = {
            let mut cache = self.cache.write();
            Arc::clone(cache.entry(ty.clone()).or_insert(built))
        };
        self.stats.write().misses += 1;
        debug!(type_name = %ty, "Serializer created");
        Ok(serializer)
    }

    fn build(&self, ty: &TypeDescriptor) -> MongoResult<SharedSerializer> {
        Ok(match ty {
            ty if ty.is_primitive() => Arc::new(ScalarSerializer::new(ty, &self.config)?),
            TypeDescriptor::Enum(_) => Arc::new(ScalarSerializer::new(ty, &self.config)?),
            TypeDescriptor::RawDocument => Arc::new(RawDocumentSerializer::default()),
            TypeDescriptor::Nullable(inner) => {
                Arc::new(NullableSerializer::new(self.resolve(inner)?))
            }
            TypeDescriptor::Array { element, rank: 1 } => {
                Arc::new(ArraySerializer::new(self.resolve(element)?))
            }
            TypeDescriptor::Array { .. } => return Err(MongoError::multi_dimensional_array(ty)),
            TypeDescriptor::Collection { kind, element } => {
                Arc::new(CollectionSerializer::new(kind.clone(), self.resolve(element)?))
            }
            TypeDescriptor::Dictionary { kind, key, value }
                if kind.is_supported() && **key == TypeDescriptor::String =>
            {
                Arc::new(DictionarySerializer::new(kind.clone(), self.resolve(value)?))
            }
            TypeDescriptor::Dictionary { .. } => return Err(MongoError::unsupported_dictionary(ty)),
            TypeDescriptor::Struct(struct_type) => {
                let fields = struct_type
                    .fields
                    .iter()
                    .map(|(_, field)| self.resolve(field))
                    .collect::<MongoResult<Vec<_>>>()?;
                Arc::new(ClassMapSerializer::new(struct_type.clone(), fields))
            }
            other => return Err(MongoError::unsupported_type(other)),
        })
    }

    /// Resolve a serializer that stores `ty` as an explicit wire representation.
    ///
    /// The representation applies to the innermost scalar: nullable wrappers,
    /// sequence elements and dictionary values are resolved through and rebuilt
    /// around it.
    pub fn resolve_with_representation(
        &self,
        ty: &TypeDescriptor,
        representation: &WireRepresentation,
    ) -> MongoResult<SharedSerializer> {
        Ok(match ty {
            TypeDescriptor::Nullable(inner) => Arc::new(NullableSerializer::new(
                self.resolve_with_representation(inner, representation)?,
            )),
            TypeDescriptor::Array { element, rank: 1 } => Arc::new(ArraySerializer::new(
                self.resolve_with_representation(element, representation)?,
            )),
            TypeDescriptor::Collection { kind, element } => Arc::new(CollectionSerializer::new(
                kind.clone(),
                self.resolve_with_representation(element, representation)?,
            )),
            TypeDescriptor::Dictionary { kind, key, value }
                if kind.is_supported() && **key == TypeDescriptor::String =>
            {
                Arc::new(DictionarySerializer::new(
                    kind.clone(),
                    self.resolve_with_representation(value, representation)?,
                ))
            }
            ty if ty.is_primitive() || matches!(ty, TypeDescriptor::Enum(_)) => Arc::new(
                ScalarSerializer::with_representation(ty, representation, &self.config)?,
            ),
            TypeDescriptor::Array { .. } => return Err(MongoError::multi_dimensional_array(ty)),
            TypeDescriptor::Dictionary { .. } => return Err(MongoError::unsupported_dictionary(ty)),
            other => return Err(MongoError::unsupported_representation(other, representation)),
        })
    }

    /// Resolve the serializer for a mapped property.
    ///
    /// A configured value converter takes precedence over the property type. An
    /// explicit wire representation applies to the converter's provider type when
    /// there is a converter, and to the property type otherwise.
    pub fn resolve_for_property(&self, property: &Property) -> MongoResult<SharedSerializer> {
        let Some(converter) = &property.converter else {
            return match &property.representation {
                Some(representation) => {
                    self.resolve_with_representation(&property.type_descriptor, representation)
                }
                None => self.resolve(&property.type_descriptor),
            };
        };

        let provider = match &property.representation {
            Some(representation) => {
                self.resolve_with_representation(&converter.provider_type, representation)?
            }
            None => self.resolve(&converter.provider_type)?,
        };

        let nullable_provider = converter.provider_type.is_nullable();
        let serializer: SharedSerializer = match (property.is_nullable(), nullable_provider) {
            (true, true) => {
                Arc::new(ValueConverterSerializer::nullable(converter.clone(), provider)?)
            }
            (true, false) => Arc::new(NullableSerializer::new(Arc::new(
                ValueConverterSerializer::new(converter.clone(), provider)?,
            ))),
            (false, _) => Arc::new(ValueConverterSerializer::new(converter.clone(), provider)?),
        };
        debug!(
            property = %property.name,
            converter = %converter.name,
            "Converter serializer created"
        );
        Ok(serializer)
    }
}
