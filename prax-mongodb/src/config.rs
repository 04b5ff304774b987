//! Mapping configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MongoError, MongoResult};

/// Default bound on nested embedded navigations.
pub const DEFAULT_MAX_EMBEDDING_DEPTH: usize = 32;

/// Options that affect how values are mapped to the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MappingConfig {
    /// How UUIDs are stored.
    pub uuid_representation: UuidRepresentation,
    /// How enums without a converter or explicit representation are stored.
    pub enum_representation: EnumRepresentation,
    /// Maximum nesting of embedded entity types.
    pub max_embedding_depth: usize,
}

/// UUID storage layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UuidRepresentation {
    /// Binary subtype 4, RFC 4122 byte order.
    #[default]
    Standard,
    /// Binary subtype 3, .NET `Guid` byte order.
    CsharpLegacy,
    /// Binary subtype 3, each 8-byte half reversed.
    JavaLegacy,
    /// Binary subtype 3, RFC 4122 byte order.
    PythonLegacy,
    /// Hyphenated string.
    String,
}

/// Enum storage forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumRepresentation {
    /// The underlying integral value.
    #[default]
    Underlying,
    /// The variant name.
    String,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            uuid_representation: UuidRepresentation::default(),
            enum_representation: EnumRepresentation::default(),
            max_embedding_depth: DEFAULT_MAX_EMBEDDING_DEPTH,
        }
    }
}

impl MappingConfig {
    /// Create a builder for configuration.
    pub fn builder() -> MappingConfigBuilder {
        MappingConfigBuilder::new()
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> MongoResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> MongoResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MongoError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> MongoResult<()> {
        if self.max_embedding_depth == 0 {
            return Err(MongoError::config("max_embedding_depth must be at least 1"));
        }
        Ok(())
    }
}

/// Builder for mapping configuration.
#[derive(Debug, Default)]
pub struct MappingConfigBuilder {
    uuid_representation: Option<UuidRepresentation>,
    enum_representation: Option<EnumRepresentation>,
    max_embedding_depth: Option<usize>,
}

impl MappingConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the UUID layout.
    pub fn uuid_representation(mut self, representation: UuidRepresentation) -> Self {
        self.uuid_representation = Some(representation);
        self
    }

    /// Set the enum storage form.
    pub fn enum_representation(mut self, representation: EnumRepresentation) -> Self {
        self.enum_representation = Some(representation);
        self
    }

    /// Set the maximum nesting of embedded entity types.
    pub fn max_embedding_depth(mut self, depth: usize) -> Self {
        self.max_embedding_depth = Some(depth);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MongoResult<MappingConfig> {
        let config = MappingConfig {
            uuid_representation: self.uuid_representation.unwrap_or_default(),
            enum_representation: self.enum_representation.unwrap_or_default(),
            max_embedding_depth: self
                .max_embedding_depth
                .unwrap_or(DEFAULT_MAX_EMBEDDING_DEPTH),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MappingConfig::default();
        assert_eq!(config.uuid_representation, UuidRepresentation::Standard);
        assert_eq!(config.enum_representation, EnumRepresentation::Underlying);
        assert_eq!(config.max_embedding_depth, 32);
    }

    #[test]
    fn test_config_from_toml() {
        let config = MappingConfig::from_toml_str(
            r#"
            uuid_representation = "csharp_legacy"
            enum_representation = "string"
            "#,
        )
        .unwrap();

        assert_eq!(config.uuid_representation, UuidRepresentation::CsharpLegacy);
        assert_eq!(config.enum_representation, EnumRepresentation::String);
        assert_eq!(config.max_embedding_depth, DEFAULT_MAX_EMBEDDING_DEPTH);
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let result = MappingConfig::from_toml_str("guid_format = \"standard\"");
        assert!(matches!(result, Err(MongoError::Toml(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = MappingConfig::builder()
            .uuid_representation(UuidRepresentation::String)
            .max_embedding_depth(4)
            .build()
            .unwrap();

        assert_eq!(config.uuid_representation, UuidRepresentation::String);
        assert_eq!(config.max_embedding_depth, 4);
    }

    #[test]
    fn test_config_builder_zero_depth() {
        let result = MappingConfig::builder().max_embedding_depth(0).build();
        assert!(result.is_err());
    }
}
