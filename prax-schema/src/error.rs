//! Error types for mapping metadata construction.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while building the mapping model.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Invalid entity type definition.
    #[error("invalid entity type `{name}`: {message}")]
    #[diagnostic(code(prax::schema::invalid_entity))]
    InvalidEntity { name: String, message: String },

    /// Invalid property definition.
    #[error("invalid property `{entity}.{property}`: {message}")]
    #[diagnostic(code(prax::schema::invalid_property))]
    InvalidProperty {
        entity: String,
        property: String,
        message: String,
    },

    /// Invalid navigation definition.
    #[error("invalid navigation `{entity}.{navigation}`: {message}")]
    #[diagnostic(code(prax::schema::invalid_navigation))]
    InvalidNavigation {
        entity: String,
        navigation: String,
        message: String,
    },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(prax::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// Unknown entity type reference.
    #[error("unknown entity type `{type_name}` referenced from `{entity}`")]
    #[diagnostic(code(prax::schema::unknown_type))]
    UnknownType { entity: String, type_name: String },

    /// Inheritance hierarchy loops back on itself.
    #[error("entity type `{name}` inherits from itself")]
    #[diagnostic(
        code(prax::schema::hierarchy_cycle),
        help("check the base type chain of `{name}`")
    )]
    HierarchyCycle { name: String },

    /// Validation error with multiple issues.
    #[error("model validation failed with {count} error(s)")]
    #[diagnostic(code(prax::schema::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<SchemaError>,
    },
}

impl SchemaError {
    /// Create an invalid entity error.
    pub fn invalid_entity(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEntity {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid property error.
    pub fn invalid_property(
        entity: impl Into<String>,
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            entity: entity.into(),
            property: property.into(),
            message: message.into(),
        }
    }

    /// Create an invalid navigation error.
    pub fn invalid_navigation(
        entity: impl Into<String>,
        navigation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidNavigation {
            entity: entity.into(),
            navigation: navigation.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an unknown type error.
    pub fn unknown_type(entity: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            entity: entity.into(),
            type_name: type_name.into(),
        }
    }

    /// Create a hierarchy cycle error.
    pub fn hierarchy_cycle(name: impl Into<String>) -> Self {
        Self::HierarchyCycle { name: name.into() }
    }

    /// Collapse a list of errors into one. A single error is returned unchanged.
    pub fn from_many(mut errors: Vec<SchemaError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            count => Some(Self::ValidationFailed { count, errors }),
        }
    }
}
