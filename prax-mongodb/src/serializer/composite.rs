//! Serializers that wrap the serializers of their parts.

use bson::{Bson, Document};
use indexmap::IndexMap;
use prax_schema::{CollectionKind, DictionaryKind, StructType, TypeDescriptor, Value};
use smol_str::SmolStr;

use super::{
    BsonSerializer, SerializationInfo, SharedSerializer, null_for_non_nullable, unexpected_bson,
    unexpected_value,
};
use crate::error::MongoResult;

/// Adds null handling in front of a non-nullable serializer.
#[derive(Debug, Clone)]
pub struct NullableSerializer {
    value_type: TypeDescriptor,
    inner: SharedSerializer,
}

impl NullableSerializer {
    /// Wrap a serializer.
    pub fn new(inner: SharedSerializer) -> Self {
        Self {
            value_type: TypeDescriptor::nullable(inner.value_type().clone()),
            inner,
        }
    }

    /// The serializer for non-null values.
    pub fn inner(&self) -> &SharedSerializer {
        &self.inner
    }
}

impl BsonSerializer for NullableSerializer {
    fn value_type(&self) -> &TypeDescriptor {
        &self.value_type
    }

    fn serialize(&self, value: &Value) -> MongoResult<Bson> {
        match value {
            Value::Null => Ok(Bson::Null),
            value => self.inner.serialize(value),
        }
    }

    fn deserialize(&self, bson: &Bson) -> MongoResult<Value> {
        match bson {
            Bson::Null | Bson::Undefined => Ok(Value::Null),
            bson => self.inner.deserialize(bson),
        }
    }

    fn try_member_info(&self, name: &str) -> Option<SerializationInfo> {
        self.inner.try_member_info(name)
    }

    fn item_serializer(&self) -> Option<SharedSerializer> {
        self.inner.item_serializer()
    }
}

fn serialize_items(
    ty: &TypeDescriptor,
    item: &SharedSerializer,
    value: &Value,
) -> MongoResult<Bson> {
    match value {
        Value::Null => Err(null_for_non_nullable(ty)),
        Value::List(items) => items
            .iter()
            .map(|v| item.serialize(v))
            .collect::<MongoResult<Vec<_>>>()
            .map(Bson::Array),
        other => Err(unexpected_value(ty, other)),
    }
}

fn deserialize_items(
    ty: &TypeDescriptor,
    item: &SharedSerializer,
    bson: &Bson,
) -> MongoResult<Vec<Value>> {
    match bson {
        Bson::Null => Err(null_for_non_nullable(ty)),
        Bson::Array(items) => items.iter().map(|b| item.deserialize(b)).collect(),
        other => Err(unexpected_bson(ty, other)),
    }
}

/// Serializer for a single-dimension array.
#[derive(Debug, Clone)]
pub struct ArraySerializer {
    value_type: TypeDescriptor,
    item: SharedSerializer,
}

impl ArraySerializer {
    /// Create an array serializer over an element serializer.
    pub fn new(item: SharedSerializer) -> Self {
        Self {
            value_type: TypeDescriptor::array(item.value_type().clone()),
            item,
        }
    }
}

impl BsonSerializer for ArraySerializer {
    fn value_type(&self) -> &TypeDescriptor {
        &self.value_type
    }

    fn serialize(&self, value: &Value) -> MongoResult<Bson> {
        serialize_items(&self.value_type, &self.item, value)
    }

    fn deserialize(&self, bson: &Bson) -> MongoResult<Value> {
        deserialize_items(&self.value_type, &self.item, bson).map(Value::List)
    }

    fn item_serializer(&self) -> Option<SharedSerializer> {
        Some(self.item.clone())
    }
}

/// How a deserialized sequence is materialized for a collection shape.
///
/// Every adapter reads the same [`Value::List`]; the adapter tells the
/// materializer which concrete collection to build from it. Only set
/// semantics change what [`CollectionSerializer`] itself returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionAdapter {
    /// The exact read-only collection wrapper.
    ReadOnlyCollection,
    /// A named subtype of the read-only collection wrapper.
    ReadOnlySubtype(SmolStr),
    /// An iterable abstraction, materialized as a list.
    MaterializedList,
    /// Any other enumerable shape, built from the sequence directly.
    Enumerable,
}

impl CollectionAdapter {
    /// Select the narrowest adapter for a collection shape.
    pub fn for_kind(kind: &CollectionKind) -> Self {
        match kind {
            CollectionKind::ReadOnlyCollection => Self::ReadOnlyCollection,
            CollectionKind::ReadOnlyCollectionSubtype(name) => Self::ReadOnlySubtype(name.clone()),
            kind if kind.is_interface() => Self::MaterializedList,
            _ => Self::Enumerable,
        }
    }
}

/// Serializer for a generic single-type-argument collection.
#[derive(Debug, Clone)]
pub struct CollectionSerializer {
    value_type: TypeDescriptor,
    kind: CollectionKind,
    adapter: CollectionAdapter,
    item: SharedSerializer,
}

impl CollectionSerializer {
    /// Create a collection serializer over an element serializer.
    pub fn new(kind: CollectionKind, item: SharedSerializer) -> Self {
        Self {
            value_type: TypeDescriptor::collection(kind.clone(), item.value_type().clone()),
            adapter: CollectionAdapter::for_kind(&kind),
            kind,
            item,
        }
    }

    /// The requested collection shape.
    pub fn kind(&self) -> &CollectionKind {
        &self.kind
    }

    /// The adapter selected for the shape.
    ///
    /// Descriptive metadata for the materializer; it does not change what
    /// [`BsonSerializer::deserialize`] returns.
    pub fn adapter(&self) -> &CollectionAdapter {
        &self.adapter
    }
}

impl BsonSerializer for CollectionSerializer {
    fn value_type(&self) -> &TypeDescriptor {
        &self.value_type
    }

    fn serialize(&self, value: &Value) -> MongoResult<Bson> {
        serialize_items(&self.value_type, &self.item, value)
    }

    fn deserialize(&self, bson: &Bson) -> MongoResult<Value> {
        let items = deserialize_items(&self.value_type, &self.item, bson)?;
        if !self.kind.is_set() {
            return Ok(Value::List(items));
        }
        let mut distinct: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !distinct.contains(&item) {
                distinct.push(item);
            }
        }
        Ok(Value::List(distinct))
    }

    fn item_serializer(&self) -> Option<SharedSerializer> {
        Some(self.item.clone())
    }
}

/// Serializer for a string-keyed map, stored as a document.
#[derive(Debug, Clone)]
pub struct DictionarySerializer {
    value_type: TypeDescriptor,
    values: SharedSerializer,
}

impl DictionarySerializer {
    /// Create a dictionary serializer over a value serializer.
    pub fn new(kind: DictionaryKind, values: SharedSerializer) -> Self {
        Self {
            value_type: TypeDescriptor::Dictionary {
                kind,
                key: Box::new(TypeDescriptor::String),
                value: Box::new(values.value_type().clone()),
            },
            values,
        }
    }
}

impl BsonSerializer for DictionarySerializer {
    fn value_type(&self) -> &TypeDescriptor {
        &self.value_type
    }

    fn serialize(&self, value: &Value) -> MongoResult<Bson> {
        match value {
            Value::Null => Err(null_for_non_nullable(&self.value_type)),
            Value::Map(entries) => {
                let mut document = Document::new();
                for (key, value) in entries {
                    document.insert(key.clone(), self.values.serialize(value)?);
                }
                Ok(Bson::Document(document))
            }
            other => Err(unexpected_value(&self.value_type, other)),
        }
    }

    fn deserialize(&self, bson: &Bson) -> MongoResult<Value> {
        match bson {
            Bson::Null => Err(null_for_non_nullable(&self.value_type)),
            Bson::Document(document) => document
                .iter()
                .map(|(key, value)| Ok((key.clone(), self.values.deserialize(value)?)))
                .collect::<MongoResult<IndexMap<_, _>>>()
                .map(Value::Map),
            other => Err(unexpected_bson(&self.value_type, other)),
        }
    }
}

/// Field-by-field serializer for plain value types with no primitive mapping.
#[derive(Debug, Clone)]
pub struct ClassMapSerializer {
    value_type: TypeDescriptor,
    fields: IndexMap<SmolStr, SerializationInfo>,
}

impl ClassMapSerializer {
    /// Create a class map from a struct type and one serializer per field, in field order.
    pub fn new(struct_type: StructType, serializers: Vec<SharedSerializer>) -> Self {
        let fields = struct_type
            .fields
            .iter()
            .zip(serializers)
            .map(|((name, ty), serializer)| {
                let info = SerializationInfo::new(vec![name.clone()], serializer, ty.clone());
                (name.clone(), info)
            })
            .collect();
        Self {
            value_type: TypeDescriptor::Struct(struct_type),
            fields,
        }
    }
}

impl BsonSerializer for ClassMapSerializer {
    fn value_type(&self) -> &TypeDescriptor {
        &self.value_type
    }

    fn serialize(&self, value: &Value) -> MongoResult<Bson> {
        let values = match value {
            Value::Null => return Err(null_for_non_nullable(&self.value_type)),
            Value::Struct(values) => values,
            other => return Err(unexpected_value(&self.value_type, other)),
        };
        let mut document = Document::new();
        for (name, info) in &self.fields {
            info.write_to(&mut document, values.get(name).unwrap_or(&Value::Null))?;
        }
        Ok(Bson::Document(document))
    }

    fn deserialize(&self, bson: &Bson) -> MongoResult<Value> {
        let document = match bson {
            Bson::Null => return Err(null_for_non_nullable(&self.value_type)),
            Bson::Document(document) => document,
            other => return Err(unexpected_bson(&self.value_type, other)),
        };
        self.fields
            .iter()
            .map(|(name, info)| Ok((name.clone(), info.read_from(document)?)))
            .collect::<MongoResult<IndexMap<_, _>>>()
            .map(Value::Struct)
    }

    fn try_member_info(&self, name: &str) -> Option<SerializationInfo> {
        self.fields.get(name).cloned()
    }
}

/// Pass-through serializer for untyped sub-documents.
#[derive(Debug, Clone)]
pub struct RawDocumentSerializer {
    value_type: TypeDescriptor,
}

impl Default for RawDocumentSerializer {
    fn default() -> Self {
        Self {
            value_type: TypeDescriptor::RawDocument,
        }
    }
}

impl BsonSerializer for RawDocumentSerializer {
    fn value_type(&self) -> &TypeDescriptor {
        &self.value_type
    }

    fn serialize(&self, value: &Value) -> MongoResult<Bson> {
        match value {
            Value::Document(document) => Ok(Bson::Document(document.clone())),
            Value::Null => Err(null_for_non_nullable(&self.value_type)),
            other => Err(unexpected_value(&self.value_type, other)),
        }
    }

    fn deserialize(&self, bson: &Bson) -> MongoResult<Value> {
        match bson {
            Bson::Document(document) => Ok(Value::Document(document.clone())),
            Bson::Null => Err(null_for_non_nullable(&self.value_type)),
            other => Err(unexpected_bson(&self.value_type, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::TypeSerializerResolver;
    use bson::{bson, doc};
    use pretty_assertions::assert_eq;

    fn resolve(ty: TypeDescriptor) -> SharedSerializer {
        TypeSerializerResolver::default().resolve(&ty).unwrap()
    }

    #[test]
    fn test_list_of_strings_round_trip() {
        let serializer = resolve(TypeDescriptor::list(TypeDescriptor::String));
        let value: Value = ["A", "B", "C"].into_iter().collect();

        let bson = serializer.serialize(&value).unwrap();
        assert_eq!(bson, bson!(["A", "B", "C"]));
        assert_eq!(serializer.deserialize(&bson).unwrap(), value);
    }

    #[test]
    fn test_nullable_wraps_inner() {
        let serializer = resolve(TypeDescriptor::nullable(TypeDescriptor::I32));
        assert_eq!(serializer.serialize(&Value::Null).unwrap(), Bson::Null);
        assert_eq!(serializer.deserialize(&Bson::Null).unwrap(), Value::Null);
        assert_eq!(serializer.serialize(&Value::I32(4)).unwrap(), Bson::Int32(4));
    }

    #[test]
    fn test_collection_adapter_preference() {
        assert_eq!(
            CollectionAdapter::for_kind(&CollectionKind::ReadOnlyCollection),
            CollectionAdapter::ReadOnlyCollection
        );
        assert_eq!(
            CollectionAdapter::for_kind(&CollectionKind::ReadOnlyCollectionSubtype("Lines".into())),
            CollectionAdapter::ReadOnlySubtype("Lines".into())
        );
        assert_eq!(
            CollectionAdapter::for_kind(&CollectionKind::ReadOnlyListView),
            CollectionAdapter::MaterializedList
        );
        assert_eq!(
            CollectionAdapter::for_kind(&CollectionKind::Iterable),
            CollectionAdapter::MaterializedList
        );
        assert_eq!(
            CollectionAdapter::for_kind(&CollectionKind::List),
            CollectionAdapter::Enumerable
        );
        assert_eq!(
            CollectionAdapter::for_kind(&CollectionKind::Custom("Bag".into())),
            CollectionAdapter::Enumerable
        );
    }

    #[test]
    fn test_adapter_does_not_change_read_value() {
        let wire = bson!([2, 1, 2]);
        let expected = Value::List(vec![Value::I32(2), Value::I32(1), Value::I32(2)]);
        for kind in [
            CollectionKind::ReadOnlyCollection,
            CollectionKind::ReadOnlyListView,
            CollectionKind::List,
        ] {
            let item: SharedSerializer = resolve(TypeDescriptor::I32);
            let serializer = CollectionSerializer::new(kind.clone(), item);
            assert_eq!(serializer.adapter(), &CollectionAdapter::for_kind(&kind));
            assert_eq!(serializer.deserialize(&wire).unwrap(), expected);
        }
    }

    #[test]
    fn test_set_discards_duplicates() {
        let serializer = resolve(TypeDescriptor::collection(
            CollectionKind::HashSet,
            TypeDescriptor::I32,
        ));
        let value = serializer.deserialize(&bson!([1, 2, 1, 3, 2])).unwrap();
        assert_eq!(value, Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(3)]));
    }

    #[test]
    fn test_array_rejects_wrong_wire_type() {
        let serializer = resolve(TypeDescriptor::array(TypeDescriptor::I32));
        assert!(serializer.deserialize(&Bson::Int32(1)).is_err());
        assert!(serializer.item_serializer().is_some());
    }

    #[test]
    fn test_dictionary_round_trip() {
        let serializer = resolve(TypeDescriptor::dictionary(
            TypeDescriptor::String,
            TypeDescriptor::I64,
        ));
        let mut entries = IndexMap::new();
        entries.insert("a".to_string(), Value::I64(1));
        entries.insert("b".to_string(), Value::I64(2));
        let value = Value::Map(entries);

        let bson = serializer.serialize(&value).unwrap();
        assert_eq!(bson, Bson::Document(doc! { "a": 1_i64, "b": 2_i64 }));
        assert_eq!(serializer.deserialize(&bson).unwrap(), value);
    }

    #[test]
    fn test_class_map_round_trip() {
        let point = StructType::new("Point")
            .field("x", TypeDescriptor::I32)
            .field("label", TypeDescriptor::nullable(TypeDescriptor::String));
        let serializer = resolve(TypeDescriptor::Struct(point));

        let mut fields = IndexMap::new();
        fields.insert(SmolStr::new("x"), Value::I32(3));
        fields.insert(SmolStr::new("label"), Value::Null);
        let value = Value::Struct(fields);

        let bson = serializer.serialize(&value).unwrap();
        assert_eq!(bson, Bson::Document(doc! { "x": 3, "label": null }));
        assert_eq!(serializer.deserialize(&bson).unwrap(), value);

        let info = serializer.try_member_info("x").unwrap();
        assert_eq!(info.element_name(), Some("x"));
        assert!(serializer.try_member_info("y").is_none());

        let err = serializer.deserialize(&Bson::Document(doc! { "label": "a" })).unwrap_err();
        assert!(err.is_document_shape_error());
    }

    #[test]
    fn test_raw_document_pass_through() {
        let serializer = resolve(TypeDescriptor::RawDocument);
        let raw = doc! { "anything": [1, "two"] };
        let bson = serializer.serialize(&Value::Document(raw.clone())).unwrap();
        assert_eq!(serializer.deserialize(&bson).unwrap(), Value::Document(raw));
    }
}
