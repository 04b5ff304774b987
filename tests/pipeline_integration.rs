//! Integration tests for the full mapping pipeline.
//!
//! A model is translated into a projection, rendered as a `$project` stage,
//! and the projected documents are shaped back into values.

use std::sync::Arc;

use bson::doc;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use prax_docmap::mongodb::query::ProjectionMapping;
use prax_docmap::mongodb::{ErrorKind, ProjectionMember};
use prax_docmap::prelude::*;
use prax_docmap::schema::{EnumType, ValueConverter};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("prax_mongodb=debug")
        .with_test_writer()
        .try_init();
}

fn level() -> EnumType {
    EnumType::new("Level").variant("Low", 0).variant("High", 1)
}

fn model() -> Arc<Model> {
    let model = Model::builder()
        .entity(
            EntityTypeBuilder::new("Reading")
                .collection("readings")
                .property(Property::new("station", TypeDescriptor::String))
                .property(Property::new("taken", TypeDescriptor::DateTime).with_element_name("t"))
                .property(Property::new("celsius", TypeDescriptor::F64))
                .property(
                    Property::new("level", TypeDescriptor::Enum(level()))
                        .with_converter(ValueConverter::enum_to_string(level())),
                )
                .property(Property::new("note", TypeDescriptor::nullable(TypeDescriptor::String)))
                .navigation(Navigation::embedded("sensor", "Sensor"))
                .key(["station", "taken"]),
        )
        .entity(
            EntityTypeBuilder::owned("Sensor")
                .property(Property::new("model", TypeDescriptor::String))
                .property(Property::new("calibrated", TypeDescriptor::Date)),
        )
        .build()
        .expect("model should build");
    Arc::new(model)
}

/// Test projection, stage rendering and shaping end to end
#[test]
fn test_project_and_shape() {
    init_tracing();
    let model = model();
    let entities = EntitySerializerCache::new(
        Arc::clone(&model),
        Arc::new(TypeSerializerResolver::new(MappingConfig::default())),
    );
    let mut query = QueryExpression::new(Arc::clone(&model), "Reading").unwrap();

    let reading = Arc::clone(
        query
            .get_mapped_projection(&ProjectionMember::root())
            .unwrap()
            .as_entity_projection()
            .unwrap(),
    );
    let sensor_model = reading
        .bind_member("sensor")
        .unwrap()
        .unwrap()
        .as_entity_projection()
        .unwrap()
        .bind_member("model")
        .unwrap()
        .unwrap();

    let mut mapping = ProjectionMapping::new();
    for name in ["station", "taken", "level", "note"] {
        mapping.insert(
            ProjectionMember::root().append(name),
            reading.bind_member(name).unwrap().unwrap(),
        );
    }
    mapping.insert(ProjectionMember::root().append("sensor"), sensor_model);
    query.replace_projection_mapping(mapping);
    query.apply_projection();

    insta::assert_snapshot!(
        query.to_project_stage().unwrap().to_string(),
        @r#"{ "$project": { "station": "$_id.station", "taken": "$_id.t", "level": "$level", "note": "$note", "sensor": "$sensor.model" } }"#
    );

    let taken = bson::DateTime::from_millis(1_700_000_000_000);
    let projected = doc! {
        "station": "north",
        "taken": taken,
        "level": "High",
        "note": null,
        "sensor": "TX-9",
    };

    let values: Vec<Value> = (0..query.projection().len())
        .map(|index| {
            ShaperExpression::for_projection_entry(&query, index, &entities)
                .unwrap()
                .evaluate(&projected)
                .unwrap()
                .into_value()
                .unwrap()
        })
        .collect();

    assert_eq!(
        values,
        vec![
            Value::from("north"),
            Value::DateTime(taken.to_chrono()),
            Value::Enum(1),
            Value::Null,
            Value::from("TX-9"),
        ]
    );
}

/// Test that a document missing a required projected value fails to shape
#[test]
fn test_missing_required_projected_value() {
    let model = model();
    let entities = EntitySerializerCache::new(
        Arc::clone(&model),
        Arc::new(TypeSerializerResolver::default()),
    );
    let mut query = QueryExpression::new(Arc::clone(&model), "Reading").unwrap();
    let celsius = query
        .get_mapped_projection(&ProjectionMember::root())
        .unwrap()
        .as_entity_projection()
        .unwrap()
        .bind_member("celsius")
        .unwrap()
        .unwrap();
    let index = query.add_to_projection(celsius, None);

    let shaper = ShaperExpression::for_projection_entry(&query, index, &entities).unwrap();
    let err = shaper.evaluate(&doc! { "station": "north" }).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DocumentShape);
    insta::assert_snapshot!(err.to_string(), @"document element `celsius` is missing but required");
}

/// Test reading a stored document member by member through the entity serializer
#[test]
fn test_read_stored_document() {
    let model = model();
    let entities = EntitySerializerCache::new(
        Arc::clone(&model),
        Arc::new(TypeSerializerResolver::default()),
    );
    let stored = doc! {
        "_id": { "station": "north", "t": bson::DateTime::from_millis(0) },
        "celsius": -3.5,
        "level": "Low",
        "sensor": { "model": "TX-9", "calibrated": bson::DateTime::from_millis(86_400_000) },
    };

    let reading = entities.get("Reading").unwrap();
    let member = |name: &str| reading.try_resolve_member(name).unwrap().read_from(&stored);
    assert_eq!(member("station").unwrap(), Value::from("north"));
    assert_eq!(member("celsius").unwrap(), Value::F64(-3.5));
    assert_eq!(member("level").unwrap(), Value::Enum(0));
    assert_eq!(member("note").unwrap(), Value::Null);

    let sensor = ShaperExpression::bind_element(
        ShaperExpression::Document,
        "sensor",
        &TypeDescriptor::nullable(TypeDescriptor::entity("Sensor")),
        &entities,
    )
    .unwrap();
    let calibrated = ShaperExpression::bind_element(
        sensor.clone(),
        "calibrated",
        &TypeDescriptor::Date,
        &entities,
    )
    .unwrap();
    assert_eq!(
        calibrated.evaluate(&stored).unwrap(),
        Shaped::Value(Value::Date(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()))
    );
}
