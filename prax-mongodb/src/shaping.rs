//! Extraction of typed values from returned documents.
//!
//! A [`ShaperExpression`] describes how to reach a value starting from the raw
//! document a query returns: through sub-documents and sub-arrays down to an
//! element read with a resolved serializer. Shapers are built from property and
//! navigation metadata, from bare element names, or from projection trees, and
//! are evaluated once per returned document.

use std::sync::Arc;

use bson::{Bson, Document};
use prax_schema::{Navigation, Property, TypeDescriptor, Value};
use smol_str::SmolStr;

use crate::document::{DocumentExt, Element, wire_type_name};
use crate::error::{MongoError, MongoResult};
use crate::expression::MongoExpression;
use crate::query::QueryExpression;
use crate::serializer::{EntitySerializerCache, SharedSerializer};

/// A value extraction step over a raw document.
#[derive(Debug, Clone)]
pub enum ShaperExpression {
    /// The returned document itself.
    Document,
    /// A sub-document held in an element of the source document.
    SubDocument {
        /// Expression for the containing document.
        source: Box<ShaperExpression>,
        /// Element name.
        element: SmolStr,
        /// Whether a missing element is an error rather than a null result.
        required: bool,
    },
    /// An array held in an element of the source document.
    SubArray {
        /// Expression for the containing document.
        source: Box<ShaperExpression>,
        /// Element name.
        element: SmolStr,
    },
    /// A typed value read from an element path of the source document.
    Value {
        /// Expression for the containing document.
        source: Box<ShaperExpression>,
        /// Element names down to the value.
        path: Vec<SmolStr>,
        /// Serializer for the value.
        serializer: SharedSerializer,
        /// The type the value is read as.
        target: TypeDescriptor,
    },
}

/// The result of evaluating a shaper.
#[derive(Debug, Clone, PartialEq)]
pub enum Shaped {
    /// The element was null, or was absent where that is allowed.
    Null,
    /// A raw sub-document.
    Document(Document),
    /// A raw array.
    Array(Vec<Bson>),
    /// A typed value.
    Value(Value),
}

impl Shaped {
    /// Check if the result is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert to a runtime value. Raw documents become [`Value::Document`];
    /// raw arrays are not values.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Null => Some(Value::Null),
            Self::Document(document) => Some(Value::Document(document)),
            Self::Value(value) => Some(value),
            Self::Array(_) => None,
        }
    }
}

impl ShaperExpression {
    /// Read a mapped property from the document `source` evaluates to.
    pub fn bind_property(
        source: ShaperExpression,
        property: &Property,
        entities: &EntitySerializerCache,
    ) -> MongoResult<Self> {
        Ok(Self::Value {
            source: Box::new(source),
            path: property.stored_path(),
            serializer: entities.resolver().resolve_for_property(property)?,
            target: property.type_descriptor.clone(),
        })
    }

    /// Read an embedded navigation from the document `source` evaluates to.
    pub fn bind_navigation(source: ShaperExpression, navigation: &Navigation) -> MongoResult<Self> {
        let element = navigation.element_name.clone().ok_or_else(|| MongoError::NotEmbedded {
            navigation: format!("{}.{}", navigation.declaring_type, navigation.name),
        })?;
        Ok(if navigation.is_collection() {
            Self::SubArray {
                source: Box::new(source),
                element,
            }
        } else {
            Self::SubDocument {
                source: Box::new(source),
                element,
                required: navigation.is_required,
            }
        })
    }

    /// Read a named element as `target`.
    ///
    /// Document-shaped targets (raw documents and entities) read the raw
    /// sub-document, sequences of them read the raw array, and anything else is
    /// deserialized with the serializer for `target`. A dotted name reads a
    /// nested element.
    pub fn bind_element(
        source: ShaperExpression,
        element: &str,
        target: &TypeDescriptor,
        entities: &EntitySerializerCache,
    ) -> MongoResult<Self> {
        let source = Box::new(source);
        let inner = target.strip_nullable();
        if is_document_shaped(inner) {
            return Ok(Self::SubDocument {
                source,
                element: SmolStr::new(element),
                required: !target.is_nullable(),
            });
        }
        if inner.sequence_element().is_some_and(is_document_shaped) {
            return Ok(Self::SubArray {
                source,
                element: SmolStr::new(element),
            });
        }
        Ok(Self::Value {
            source,
            path: element.split('.').map(SmolStr::new).collect(),
            serializer: entities.resolve_type(target)?,
            target: target.clone(),
        })
    }

    /// Build the shaper for a projection tree node, read from the queried document.
    pub fn for_expression(
        expression: &MongoExpression,
        entities: &EntitySerializerCache,
    ) -> MongoResult<Self> {
        match expression {
            MongoExpression::Root(_) => Ok(Self::Document),
            MongoExpression::EntityProjection(projection) => {
                Self::for_expression(projection.access(), entities)
            }
            MongoExpression::ObjectAccess(access) => Ok(Self::SubDocument {
                source: Box::new(Self::for_expression(access.parent(), entities)?),
                element: SmolStr::new(access.element()),
                required: access.navigation().is_required,
            }),
            MongoExpression::ArrayAccess(access) => Ok(Self::SubArray {
                source: Box::new(Self::for_expression(access.parent(), entities)?),
                element: SmolStr::new(access.element()),
            }),
            MongoExpression::Property(bound) => Self::bind_property(
                Self::for_expression(bound.projection(), entities)?,
                bound.property(),
                entities,
            ),
            MongoExpression::ProjectionIndex(index) => Err(MongoError::internal(format!(
                "projection placeholder {index} cannot be shaped directly"
            ))),
        }
    }

    /// Build the shaper for a finalized projection entry, read from the projected document.
    pub fn for_projection_entry(
        query: &QueryExpression,
        index: usize,
        entities: &EntitySerializerCache,
    ) -> MongoResult<Self> {
        let entry = query.projection().get(index).ok_or_else(|| {
            MongoError::internal(format!("projection index {index} is out of range"))
        })?;
        let element = SmolStr::new(entry.output_name(index));
        let source = Box::new(Self::Document);
        match &entry.expression {
            MongoExpression::Root(_) => Ok(Self::SubDocument {
                source,
                element,
                required: true,
            }),
            MongoExpression::EntityProjection(projection) => Ok(Self::SubDocument {
                source,
                element,
                required: match projection.access() {
                    MongoExpression::ObjectAccess(access) => access.navigation().is_required,
                    _ => true,
                },
            }),
            MongoExpression::ObjectAccess(access) => Ok(Self::SubDocument {
                source,
                element,
                required: access.navigation().is_required,
            }),
            MongoExpression::ArrayAccess(_) => Ok(Self::SubArray { source, element }),
            MongoExpression::Property(bound) => Ok(Self::Value {
                source,
                path: vec![element],
                serializer: entities.resolver().resolve_for_property(bound.property())?,
                target: bound.property().type_descriptor.clone(),
            }),
            MongoExpression::ProjectionIndex(_) => Err(MongoError::internal(format!(
                "projection entry {index} is a placeholder"
            ))),
        }
    }

    /// Evaluate against a returned document.
    pub fn evaluate(&self, document: &Document) -> MongoResult<Shaped> {
        match self {
            Self::Document => Ok(Shaped::Document(document.clone())),
            Self::SubDocument { .. } => Ok(match self.resolve_document(document)? {
                Some(sub) => Shaped::Document(sub.clone()),
                None => Shaped::Null,
            }),
            Self::SubArray { source, element } => {
                let Some(parent) = source.resolve_document(document)? else {
                    return Ok(Shaped::Null);
                };
                match parent.element(element) {
                    Element::Missing => Err(MongoError::missing_element(element.as_str())),
                    Element::Null => Ok(Shaped::Null),
                    Element::Present(Bson::Array(items)) => Ok(Shaped::Array(items.clone())),
                    Element::Present(other) => Err(MongoError::unexpected_wire_type(
                        element.as_str(),
                        "array",
                        wire_type_name(other),
                    )),
                }
            }
            Self::Value {
                source,
                path,
                serializer,
                target,
            } => {
                let Some(parent) = source.resolve_document(document)? else {
                    return Ok(Shaped::Null);
                };
                match parent.element_at(path.as_slice()) {
                    Element::Present(bson) => serializer.deserialize(bson).map(Shaped::Value),
                    Element::Missing | Element::Null if target.is_nullable() => Ok(Shaped::Null),
                    Element::Missing => Err(MongoError::missing_element(path.join("."))),
                    Element::Null => Err(MongoError::null_element(path.join("."))),
                }
            }
        }
    }

    /// Evaluate a document-valued shaper without copying. `None` means null.
    fn resolve_document<'a>(&self, document: &'a Document) -> MongoResult<Option<&'a Document>> {
        match self {
            Self::Document => Ok(Some(document)),
            Self::SubDocument {
                source,
                element,
                required,
            } => {
                let Some(parent) = source.resolve_document(document)? else {
                    return Ok(None);
                };
                match parent.element(element) {
                    Element::Present(Bson::Document(sub)) => Ok(Some(sub)),
                    Element::Null => Ok(None),
                    Element::Missing if *required => {
                        Err(MongoError::missing_element(element.as_str()))
                    }
                    Element::Missing => Ok(None),
                    Element::Present(other) => Err(MongoError::unexpected_wire_type(
                        element.as_str(),
                        "document",
                        wire_type_name(other),
                    )),
                }
            }
            Self::SubArray { .. } | Self::Value { .. } => Err(MongoError::internal(
                "shaper source does not evaluate to a document",
            )),
        }
    }
}

fn is_document_shaped(ty: &TypeDescriptor) -> bool {
    matches!(ty, TypeDescriptor::RawDocument | TypeDescriptor::Entity(_))
}

/// Shapers for one entity type's stored members, in member order.
pub fn entity_shapers(
    source: &ShaperExpression,
    entity: &str,
    entities: &EntitySerializerCache,
) -> MongoResult<Vec<(SmolStr, ShaperExpression)>> {
    let entity_type = entities
        .model()
        .entity(entity)
        .map(Arc::clone)
        .ok_or_else(|| {
            MongoError::config(format!("entity type `{entity}` is not part of the model"))
        })?;

    let mut shapers = Vec::new();
    for property in entity_type.stored_properties() {
        shapers.push((
            property.name.clone(),
            ShaperExpression::bind_property(source.clone(), property, entities)?,
        ));
    }
    for navigation in entity_type.embedded_navigations() {
        shapers.push((
            navigation.name.clone(),
            ShaperExpression::bind_navigation(source.clone(), navigation)?,
        ));
    }
    Ok(shapers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{EntityProjectionExpression, fixtures};
    use crate::query::ProjectionMember;
    use crate::serializer::TypeSerializerResolver;
    use bson::{doc, oid::ObjectId};
    use pretty_assertions::assert_eq;
    use prax_schema::{EntityTypeBuilder, Model};

    fn entities() -> EntitySerializerCache {
        EntitySerializerCache::new(fixtures::model(), Arc::new(TypeSerializerResolver::default()))
    }

    #[test]
    fn test_missing_required_element() {
        let entities = entities();
        let doc = doc! { "name": "Ada" };

        let required = ShaperExpression::bind_element(
            ShaperExpression::Document,
            "age",
            &TypeDescriptor::I32,
            &entities,
        )
        .unwrap();
        let err = required.evaluate(&doc).unwrap_err();
        assert_eq!(err.to_string(), "document element `age` is missing but required");

        let optional = ShaperExpression::bind_element(
            ShaperExpression::Document,
            "age",
            &TypeDescriptor::nullable(TypeDescriptor::I32),
            &entities,
        )
        .unwrap();
        assert_eq!(optional.evaluate(&doc).unwrap(), Shaped::Null);
    }

    #[test]
    fn test_null_required_element() {
        let entities = entities();
        let shaper = ShaperExpression::bind_element(
            ShaperExpression::Document,
            "age",
            &TypeDescriptor::I32,
            &entities,
        )
        .unwrap();
        let err = shaper.evaluate(&doc! { "age": null }).unwrap_err();
        assert!(matches!(err, MongoError::NullElement { .. }));
    }

    #[test]
    fn test_dotted_element_path() {
        let entities = entities();
        let shaper = ShaperExpression::bind_element(
            ShaperExpression::Document,
            "address.city",
            &TypeDescriptor::String,
            &entities,
        )
        .unwrap();
        let shaped = shaper.evaluate(&doc! { "address": { "city": "Oslo" } }).unwrap();
        assert_eq!(shaped, Shaped::Value(Value::from("Oslo")));
    }

    #[test]
    fn test_array_targets() {
        let entities = entities();
        let model = entities.model().clone();
        let customer = model.entity("Customer").unwrap();
        let orders = customer.find_navigation("orders").unwrap();
        let shaper = ShaperExpression::bind_navigation(ShaperExpression::Document, orders).unwrap();

        let err = shaper.evaluate(&doc! {}).unwrap_err();
        assert!(matches!(err, MongoError::MissingElement { .. }));

        let err = shaper.evaluate(&doc! { "orders": "nope" }).unwrap_err();
        assert_eq!(err.to_string(), "document element `orders` should be array but is string");

        assert_eq!(shaper.evaluate(&doc! { "orders": null }).unwrap(), Shaped::Null);

        let shaped = shaper.evaluate(&doc! { "orders": [{ "sku": "a", "qty": 1 }] }).unwrap();
        assert_eq!(shaped, Shaped::Array(vec![Bson::Document(doc! { "sku": "a", "qty": 1 })]));
    }

    #[test]
    fn test_document_targets() {
        let entities = entities();
        let shaper = ShaperExpression::bind_element(
            ShaperExpression::Document,
            "address",
            &TypeDescriptor::nullable(TypeDescriptor::entity("Address")),
            &entities,
        )
        .unwrap();
        assert_eq!(shaper.evaluate(&doc! { "address": null }).unwrap(), Shaped::Null);
        assert_eq!(
            shaper.evaluate(&doc! { "address": { "city": "Oslo" } }).unwrap(),
            Shaped::Document(doc! { "city": "Oslo" })
        );
        let err = shaper.evaluate(&doc! { "address": 3 }).unwrap_err();
        assert!(err.is_document_shape_error());
    }

    #[test]
    fn test_composite_key_path() {
        let model = Model::builder()
            .entity(
                EntityTypeBuilder::new("Order")
                    .collection("orders")
                    .property(Property::new("tenant", TypeDescriptor::String))
                    .property(Property::new("number", TypeDescriptor::I64))
                    .key(["tenant", "number"]),
            )
            .build()
            .unwrap();
        let model = Arc::new(model);
        let entities = EntitySerializerCache::new(
            Arc::clone(&model),
            Arc::new(TypeSerializerResolver::default()),
        );
        let number = model.entity("Order").unwrap().find_property("number").unwrap();

        let shaper =
            ShaperExpression::bind_property(ShaperExpression::Document, number, &entities)
                .unwrap();
        match &shaper {
            ShaperExpression::Value { path, .. } => {
                assert_eq!(path, &vec![SmolStr::new("_id"), SmolStr::new("number")]);
            }
            other => panic!("expected value shaper, got {other:?}"),
        }
        let doc = doc! { "_id": { "tenant": "acme", "number": 7_i64 } };
        assert_eq!(shaper.evaluate(&doc).unwrap(), Shaped::Value(Value::I64(7)));
    }

    #[test]
    fn test_shaper_from_projection_tree() {
        let entities = entities();
        let model = entities.model().clone();
        let customer = Arc::clone(model.entity("Customer").unwrap());
        let root = EntityProjectionExpression::root(customer, Arc::clone(&model));
        let lat = root
            .bind_member("address")
            .unwrap()
            .unwrap()
            .as_entity_projection()
            .unwrap()
            .bind_member("geo")
            .unwrap()
            .unwrap()
            .as_entity_projection()
            .unwrap()
            .bind_member("lat")
            .unwrap()
            .unwrap();

        let shaper = ShaperExpression::for_expression(&lat, &entities).unwrap();
        let doc = doc! { "address": { "city": "Oslo", "geo": { "lat": 59.9 } } };
        assert_eq!(shaper.evaluate(&doc).unwrap(), Shaped::Value(Value::F64(59.9)));

        // An absent optional address short-circuits to null.
        assert_eq!(shaper.evaluate(&doc! {}).unwrap(), Shaped::Null);

        // A present address without its required geo sub-document is an error.
        let err = shaper.evaluate(&doc! { "address": { "city": "Oslo" } }).unwrap_err();
        assert!(matches!(err, MongoError::MissingElement { .. }));
    }

    #[test]
    fn test_shaper_for_projection_entries() {
        let entities = entities();
        let mut query = QueryExpression::new(entities.model().clone(), "Customer").unwrap();
        let root = Arc::clone(
            query
                .get_mapped_projection(&ProjectionMember::root())
                .unwrap()
                .as_entity_projection()
                .unwrap(),
        );
        let id = root.bind_member("id").unwrap().unwrap();
        let address = root.bind_member("address").unwrap().unwrap();
        let id_index = query.add_to_projection(id, None);
        let address_index = query.add_to_projection(address, None);

        let oid = ObjectId::new();
        let projected = doc! { "id": oid, "address": { "city": "Oslo" } };

        let id_shaper =
            ShaperExpression::for_projection_entry(&query, id_index, &entities).unwrap();
        assert_eq!(id_shaper.evaluate(&projected).unwrap(), Shaped::Value(Value::ObjectId(oid)));

        let address_shaper =
            ShaperExpression::for_projection_entry(&query, address_index, &entities).unwrap();
        assert_eq!(
            address_shaper.evaluate(&projected).unwrap(),
            Shaped::Document(doc! { "city": "Oslo" })
        );
        assert!(ShaperExpression::for_projection_entry(&query, 9, &entities).is_err());
    }

    #[test]
    fn test_entity_shapers() {
        let entities = entities();
        let shapers = entity_shapers(&ShaperExpression::Document, "OrderLine", &entities).unwrap();
        let names: Vec<_> = shapers.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["sku", "qty"]);

        let line = doc! { "sku": "a-1", "qty": 3 };
        let values: Vec<_> = shapers
            .iter()
            .map(|(_, shaper)| shaper.evaluate(&line).unwrap())
            .collect();
        assert_eq!(
            values,
            vec![Shaped::Value(Value::from("a-1")), Shaped::Value(Value::I32(3))]
        );
    }
}
