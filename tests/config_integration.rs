//! Integration tests for mapping configuration parsing and handling.
//!
//! These tests verify that the configuration system correctly handles
//! various configuration scenarios.

use prax_docmap::mongodb::config::{
    DEFAULT_MAX_EMBEDDING_DEPTH, EnumRepresentation, UuidRepresentation,
};
use prax_docmap::mongodb::{ErrorKind, MappingConfig};

/// Test that an empty configuration uses defaults
#[test]
fn test_config_minimal() {
    let config = MappingConfig::from_toml_str("").expect("Failed to parse config");
    assert_eq!(config, MappingConfig::default());
    assert_eq!(config.max_embedding_depth, DEFAULT_MAX_EMBEDDING_DEPTH);
}

/// Test full configuration with all options
#[test]
fn test_config_full() {
    let config_str = r#"
        uuid_representation = "csharp_legacy"
        enum_representation = "string"
        max_embedding_depth = 4
    "#;

    let config = MappingConfig::from_toml_str(config_str).expect("Failed to parse config");
    assert_eq!(config.uuid_representation, UuidRepresentation::CsharpLegacy);
    assert_eq!(config.enum_representation, EnumRepresentation::String);
    assert_eq!(config.max_embedding_depth, 4);
}

/// Test that the builder and TOML produce the same configuration
#[test]
fn test_config_builder_matches_toml() {
    let built = MappingConfig::builder()
        .uuid_representation(UuidRepresentation::JavaLegacy)
        .max_embedding_depth(8)
        .build()
        .unwrap();
    let parsed = MappingConfig::from_toml_str(
        r#"
        uuid_representation = "java_legacy"
        max_embedding_depth = 8
    "#,
    )
    .unwrap();
    assert_eq!(built, parsed);
}

/// Test that unknown keys are rejected
#[test]
fn test_config_unknown_key() {
    let err = MappingConfig::from_toml_str("guid_representation = \"standard\"").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

/// Test that a zero embedding depth is rejected
#[test]
fn test_config_zero_depth() {
    let err = MappingConfig::from_toml_str("max_embedding_depth = 0").unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"configuration error: max_embedding_depth must be at least 1"
    );
}

/// Test that the configuration serializes back to TOML
#[test]
fn test_config_round_trip() {
    let config = MappingConfig::builder()
        .enum_representation(EnumRepresentation::String)
        .build()
        .unwrap();
    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("enum_representation = \"string\""));
    assert_eq!(MappingConfig::from_toml_str(&text).unwrap(), config);
}
