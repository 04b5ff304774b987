//! Conversion between runtime values and the BSON wire format.
//!
//! Every mapped type resolves to a [`BsonSerializer`]. Primitive types map to
//! fixed wire types through [`ScalarSerializer`]; composite shapes (nullable
//! wrappers, arrays, collections, dictionaries, plain structs) wrap the
//! serializers of their parts. [`TypeSerializerResolver`] dispatches on the
//! [`TypeDescriptor`] shape and memoizes the result, and
//! [`EntitySerializerCache`] does the same for entity types.

mod composite;
mod converter;
mod decimal128;
mod entity;
mod numeric;
mod resolver;
mod scalar;
mod temporal;
mod uuid_layout;

use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document};
use prax_schema::{TypeDescriptor, Value};
use smol_str::SmolStr;

use crate::document::{DocumentExt, Element};
use crate::error::{MongoError, MongoResult};

pub use composite::{
    ArraySerializer, ClassMapSerializer, CollectionAdapter, CollectionSerializer,
    DictionarySerializer, NullableSerializer, RawDocumentSerializer,
};
pub use converter::ValueConverterSerializer;
pub use decimal128::{decimal_from_decimal128, decimal_to_decimal128};
pub use entity::{EntitySerializer, EntitySerializerCache};
pub use resolver::TypeSerializerResolver;
pub use scalar::ScalarSerializer;
pub use temporal::{format_duration, parse_duration};

/// Converts values of one type to and from BSON.
pub trait BsonSerializer: Send + Sync + fmt::Debug {
    /// The type this serializer handles.
    fn value_type(&self) -> &TypeDescriptor;

    /// Convert a value to BSON.
    fn serialize(&self, value: &Value) -> MongoResult<Bson>;

    /// Convert BSON back to a value.
    fn deserialize(&self, bson: &Bson) -> MongoResult<Value>;

    /// Where a named member of the value is stored, for document-shaped values.
    fn try_member_info(&self, _name: &str) -> Option<SerializationInfo> {
        None
    }

    /// The element serializer, for sequence-shaped values.
    fn item_serializer(&self) -> Option<SharedSerializer> {
        None
    }
}

/// A shareable serializer.
pub type SharedSerializer = Arc<dyn BsonSerializer>;

/// Where a member lives in a document and how to read it.
#[derive(Debug, Clone)]
pub struct SerializationInfo {
    /// Element names from the containing document down to the value.
    pub element_path: Vec<SmolStr>,
    /// Serializer for the value.
    pub serializer: SharedSerializer,
    /// The type the value is read as.
    pub nominal_type: TypeDescriptor,
}

impl SerializationInfo {
    /// Create serialization info.
    pub fn new(
        element_path: Vec<SmolStr>,
        serializer: SharedSerializer,
        nominal_type: TypeDescriptor,
    ) -> Self {
        Self {
            element_path,
            serializer,
            nominal_type,
        }
    }

    /// The element name, if the value is stored directly in the containing document.
    pub fn element_name(&self) -> Option<&str> {
        match self.element_path.as_slice() {
            [name] => Some(name),
            _ => None,
        }
    }

    /// The element path joined with dots.
    pub fn dotted_path(&self) -> String {
        self.element_path.join(".")
    }

    /// The aggregation field reference for the element, such as `$_id.tenant`.
    pub fn field_reference(&self) -> String {
        format!("${}", self.dotted_path())
    }

    /// Read the value from a document.
    pub fn read_from(&self, document: &Document) -> MongoResult<Value> {
        match document.element_at(self.element_path.as_slice()) {
            Element::Present(bson) => self.serializer.deserialize(bson),
            Element::Null if self.nominal_type.is_nullable() => Ok(Value::Null),
            Element::Missing if self.nominal_type.is_nullable() => Ok(Value::Null),
            Element::Null => Err(MongoError::null_element(self.dotted_path())),
            Element::Missing => Err(MongoError::missing_element(self.dotted_path())),
        }
    }

    /// Write a value into a document, creating parent sub-documents as needed.
    pub fn write_to(&self, document: &mut Document, value: &Value) -> MongoResult<()> {
        let bson = self.serializer.serialize(value)?;
        if document.set_at(self.element_path.as_slice(), bson) {
            Ok(())
        } else {
            Err(MongoError::serialization(format!(
                "cannot write element `{}`: a parent element is not a document",
                self.dotted_path()
            )))
        }
    }
}

/// Statistics for a serializer cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of serializers currently cached.
    pub cached_count: usize,
}

impl CacheStats {
    /// Get the cache hit rate.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub(crate) fn null_for_non_nullable(ty: &TypeDescriptor) -> MongoError {
    MongoError::serialization(format!("null is not a valid value of non-nullable type `{ty}`"))
}

pub(crate) fn unexpected_value(ty: &TypeDescriptor, value: &Value) -> MongoError {
    MongoError::serialization(format!(
        "expected a value of type `{ty}` but got {}",
        value.kind_name()
    ))
}

pub(crate) fn unexpected_bson(ty: &TypeDescriptor, bson: &Bson) -> MongoError {
    MongoError::serialization(format!(
        "cannot read {} as type `{ty}`",
        crate::document::wire_type_name(bson)
    ))
}
