//! Error types for document mapping and query assembly.

use prax_schema::ConversionError;
use thiserror::Error;

/// Result type for document mapping operations.
pub type MongoResult<T> = Result<T, MongoError>;

/// Broad classes of mapping failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No serializer exists for a type or representation. Requires a model change.
    UnsupportedMapping,
    /// A value converter is configured incorrectly.
    InvalidConverter,
    /// A whole entity was used where only keys or fields can be compared.
    UnsupportedComparison,
    /// An expression tree references a member that does not belong to the projected entity.
    Binding,
    /// A returned document does not have the expected shape.
    DocumentShape,
    /// A value could not be converted to or from the wire format.
    Serialization,
    /// Invalid configuration.
    Configuration,
    /// A bug in expression tree construction.
    Internal,
}

/// Errors that can occur while mapping values and building query expressions.
#[derive(Error, Debug)]
pub enum MongoError {
    /// No serializer can be resolved for the type.
    #[error("type `{type_name}` is not supported; map it with a value converter instead")]
    UnsupportedType { type_name: String },

    /// Arrays of more than one dimension cannot be stored.
    #[error("multi-dimensional array type `{type_name}` is not supported")]
    MultiDimensionalArray { type_name: String },

    /// The dictionary shape or key type cannot be stored as a document.
    #[error(
        "unsupported dictionary type `{type_name}`; only string-keyed dictionaries can be stored"
    )]
    UnsupportedDictionary { type_name: String },

    /// The explicit wire representation is not valid for the type.
    #[error("type `{type_name}` cannot be represented as {representation}")]
    UnsupportedRepresentation {
        type_name: String,
        representation: String,
    },

    /// A value converter declares a nullable model type.
    #[error(
        "value converter `{converter}` has nullable model type `{model_type}`; null values are \
         handled by the mapping layer, so declare the converter on `{inner_type}` instead"
    )]
    InvalidConverter {
        converter: String,
        model_type: String,
        inner_type: String,
    },

    /// A whole entity was serialized, typically to compare two entities.
    #[error(
        "entity type `{entity}` cannot be serialized or compared as a whole; compare by key ({}) \
         or by specific fields instead",
        .keys.join(", ")
    )]
    UnsupportedComparison { entity: String, keys: Vec<String> },

    /// The member does not belong to the projected entity type.
    #[error("unable to bind member `{declaring_type}.{member}` on entity type `{entity}`")]
    UnableToBind {
        member: String,
        declaring_type: String,
        entity: String,
    },

    /// The navigation does not point to an embedded entity type.
    #[error("navigation `{navigation}` does not point to an embedded entity type")]
    NotEmbedded { navigation: String },

    /// A required element is absent from the document.
    #[error("document element `{element}` is missing but required")]
    MissingElement { element: String },

    /// A required element is null.
    #[error("document element `{element}` is null for required non-nullable property")]
    NullElement { element: String },

    /// An element holds a value of the wrong wire type.
    #[error("document element `{element}` should be {expected} but is {actual}")]
    UnexpectedWireType {
        element: String,
        expected: String,
        actual: String,
    },

    /// A value could not be converted to or from the wire format.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A value converter failed.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MongoError {
    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl ToString) -> Self {
        Self::UnsupportedType {
            type_name: type_name.to_string(),
        }
    }

    /// Create a multi-dimensional array error.
    pub fn multi_dimensional_array(type_name: impl ToString) -> Self {
        Self::MultiDimensionalArray {
            type_name: type_name.to_string(),
        }
    }

    /// Create an unsupported dictionary error.
    pub fn unsupported_dictionary(type_name: impl ToString) -> Self {
        Self::UnsupportedDictionary {
            type_name: type_name.to_string(),
        }
    }

    /// Create an unsupported representation error.
    pub fn unsupported_representation(
        type_name: impl ToString,
        representation: impl ToString,
    ) -> Self {
        Self::UnsupportedRepresentation {
            type_name: type_name.to_string(),
            representation: representation.to_string(),
        }
    }

    /// Create an unsupported comparison error.
    pub fn unsupported_comparison<I, S>(entity: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::UnsupportedComparison {
            entity: entity.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an unable to bind error.
    pub fn unable_to_bind(
        member: impl Into<String>,
        declaring_type: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        Self::UnableToBind {
            member: member.into(),
            declaring_type: declaring_type.into(),
            entity: entity.into(),
        }
    }

    /// Create a missing element error.
    pub fn missing_element(element: impl Into<String>) -> Self {
        Self::MissingElement {
            element: element.into(),
        }
    }

    /// Create a null element error.
    pub fn null_element(element: impl Into<String>) -> Self {
        Self::NullElement {
            element: element.into(),
        }
    }

    /// Create an unexpected wire type error.
    pub fn unexpected_wire_type(
        element: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::UnexpectedWireType {
            element: element.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The class of failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedType { .. }
            | Self::MultiDimensionalArray { .. }
            | Self::UnsupportedDictionary { .. }
            | Self::UnsupportedRepresentation { .. } => ErrorKind::UnsupportedMapping,
            Self::InvalidConverter { .. } => ErrorKind::InvalidConverter,
            Self::UnsupportedComparison { .. } => ErrorKind::UnsupportedComparison,
            Self::UnableToBind { .. } | Self::NotEmbedded { .. } => ErrorKind::Binding,
            Self::MissingElement { .. }
            | Self::NullElement { .. }
            | Self::UnexpectedWireType { .. } => ErrorKind::DocumentShape,
            Self::Serialization(_) | Self::Conversion(_) => ErrorKind::Serialization,
            Self::Config(_) | Self::Toml(_) => ErrorKind::Configuration,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if no serializer could be resolved.
    pub fn is_unsupported_mapping(&self) -> bool {
        self.kind() == ErrorKind::UnsupportedMapping
    }

    /// Check if a returned document had the wrong shape.
    pub fn is_document_shape_error(&self) -> bool {
        self.kind() == ErrorKind::DocumentShape
    }

    /// Check if this is a binding failure.
    pub fn is_binding_error(&self) -> bool {
        self.kind() == ErrorKind::Binding
    }
}

impl From<bson::oid::Error> for MongoError {
    fn from(err: bson::oid::Error) -> Self {
        MongoError::Serialization(format!("invalid object id: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(MongoError::unsupported_type("Foo").is_unsupported_mapping());
        assert!(MongoError::multi_dimensional_array("Array2D<i32>").is_unsupported_mapping());
        assert!(MongoError::missing_element("age").is_document_shape_error());
        assert!(MongoError::unable_to_bind("a", "B", "C").is_binding_error());
        assert_eq!(MongoError::config("bad").kind(), ErrorKind::Configuration);
        assert_eq!(
            MongoError::unsupported_comparison("Order", ["_id"]).kind(),
            ErrorKind::UnsupportedComparison
        );
    }

    #[test]
    fn test_error_display() {
        let err = MongoError::missing_element("age");
        assert_eq!(err.to_string(), "document element `age` is missing but required");

        let err = MongoError::null_element("age");
        assert_eq!(
            err.to_string(),
            "document element `age` is null for required non-nullable property"
        );

        let err = MongoError::unsupported_comparison("Order", ["tenant", "number"]);
        insta::assert_snapshot!(err.to_string(), @"entity type `Order` cannot be serialized or compared as a whole; compare by key (tenant, number) or by specific fields instead");
    }

    #[test]
    fn test_from_conversion_error() {
        let err: MongoError = ConversionError::new("bool_to_int", "unexpected String value").into();
        assert_eq!(
            err.to_string(),
            "conversion error: bool_to_int: unexpected String value"
        );
    }
}
