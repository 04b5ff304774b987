//! Integration tests for mapping model construction and validation.
//!
//! These tests verify that the model builder correctly handles various
//! entity definitions and edge cases.

use pretty_assertions::assert_eq;
use prax_docmap::schema::{
    CollectionKind, EntityTypeBuilder, Model, Navigation, Property, SchemaError, TypeDescriptor,
    Value,
};

/// Test a model with a hierarchy, owned types and embedded collections
#[test]
fn test_build_model_with_hierarchy() {
    let model = Model::builder()
        .entity(
            EntityTypeBuilder::new("Vehicle")
                .collection("vehicles")
                .property(Property::new("vin", TypeDescriptor::String).with_element_name("_id"))
                .property(Property::new("type", TypeDescriptor::String))
                .navigation(
                    Navigation::embedded("services", "Service")
                        .with_collection(CollectionKind::List),
                )
                .key(["vin"])
                .discriminator("type", "vehicle"),
        )
        .entity(
            EntityTypeBuilder::new("Truck")
                .base("Vehicle")
                .property(Property::new("payload", TypeDescriptor::F64))
                .discriminator_value("truck"),
        )
        .entity(
            EntityTypeBuilder::owned("Service")
                .property(Property::new("at", TypeDescriptor::DateTime)),
        )
        .build()
        .expect("Failed to build model");

    let truck = model.entity("Truck").expect("Entity not found");
    assert_eq!(truck.collection_name.as_deref(), Some("vehicles"));
    assert_eq!(truck.ancestors, vec!["Vehicle"]);
    assert_eq!(truck.discriminator.as_deref(), Some("type"));
    assert_eq!(truck.discriminator_value, Some(Value::from("truck")));
    assert_eq!(
        truck.properties.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
        vec!["vin", "type", "payload"]
    );
    assert!(model.is_assignable_from("Vehicle", "Truck"));
    assert!(!model.is_assignable_from("Truck", "Vehicle"));
    assert_eq!(model.derived_types("Vehicle").count(), 1);
}

/// Test that composite keys move into `_id`
#[test]
fn test_composite_key_storage() {
    let model = Model::builder()
        .entity(
            EntityTypeBuilder::new("Seat")
                .collection("seats")
                .property(Property::new("row", TypeDescriptor::String))
                .property(Property::new("number", TypeDescriptor::I32).with_element_name("n"))
                .key(["row", "number"]),
        )
        .build()
        .expect("Failed to build model");

    let seat = model.entity("Seat").unwrap();
    assert!(seat.has_composite_key());
    assert_eq!(seat.stored_key_names(), vec!["row", "n"]);
    assert_eq!(
        seat.find_property("number").unwrap().stored_path(),
        vec!["_id", "n"]
    );
}

/// Test that independent problems are all reported
#[test]
fn test_validation_collects_errors() {
    let err = Model::builder()
        .entity(EntityTypeBuilder::new("A").key(["missing"]))
        .entity(EntityTypeBuilder::new("B").key(["missing"]))
        .build()
        .unwrap_err();

    match err {
        SchemaError::ValidationFailed { count, errors } => {
            assert_eq!(count, 2);
            assert!(errors
                .iter()
                .all(|e| matches!(e, SchemaError::InvalidProperty { .. })));
        }
        other => panic!("expected aggregated errors, got {other}"),
    }
}

/// Test that navigations to unknown entity types are rejected
#[test]
fn test_unknown_navigation_target() {
    let err = Model::builder()
        .entity(
            EntityTypeBuilder::new("A").navigation(Navigation::embedded("b", "Missing")),
        )
        .build()
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"unknown entity type `Missing` referenced from `A`");
}
