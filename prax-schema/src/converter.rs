//! Bidirectional value converters between a model type and a storage type.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;
use thiserror::Error;

use crate::types::{EnumType, TypeDescriptor};
use crate::value::Value;

/// A failed value conversion.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{converter}: {message}")]
pub struct ConversionError {
    /// Name of the converter that failed.
    pub converter: SmolStr,
    /// Failure details.
    pub message: String,
}

impl ConversionError {
    /// Create a conversion error.
    pub fn new(converter: impl Into<SmolStr>, message: impl Into<String>) -> Self {
        Self {
            converter: converter.into(),
            message: message.into(),
        }
    }
}

/// A conversion closure.
pub type ConvertFn = Arc<dyn Fn(&Value) -> Result<Value, ConversionError> + Send + Sync>;

/// A bidirectional transform between a model type and a storage type.
#[derive(Clone)]
pub struct ValueConverter {
    /// Converter name, used in diagnostics.
    pub name: SmolStr,
    /// The type the application sees.
    pub model_type: TypeDescriptor,
    /// The type stored in the document.
    pub provider_type: TypeDescriptor,
    to_provider: ConvertFn,
    from_provider: ConvertFn,
}

impl ValueConverter {
    /// Create a converter from a pair of closures.
    pub fn new<F, G>(
        name: impl Into<SmolStr>,
        model_type: TypeDescriptor,
        provider_type: TypeDescriptor,
        to_provider: F,
        from_provider: G,
    ) -> Self
    where
        F: Fn(&Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
        G: Fn(&Value) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            model_type,
            provider_type,
            to_provider: Arc::new(to_provider),
            from_provider: Arc::new(from_provider),
        }
    }

    /// Convert a model value to its stored form.
    pub fn to_provider(&self, value: &Value) -> Result<Value, ConversionError> {
        (self.to_provider)(value)
    }

    /// Convert a stored value back to the model type.
    pub fn from_provider(&self, value: &Value) -> Result<Value, ConversionError> {
        (self.from_provider)(value)
    }

    /// Store an enum as its variant name.
    pub fn enum_to_string(enum_type: EnumType) -> Self {
        let to = enum_type.clone();
        let from = enum_type.clone();
        Self::new(
            "enum_to_string",
            TypeDescriptor::Enum(enum_type),
            TypeDescriptor::String,
            move |value| {
                let n = value.as_i64().ok_or_else(|| unexpected("enum_to_string", value))?;
                to.name_of(n).map(Value::from).ok_or_else(|| {
                    ConversionError::new(
                        "enum_to_string",
                        format!("{n} is not a variant of `{}`", to.name),
                    )
                })
            },
            move |value| {
                let s = value.as_str().ok_or_else(|| unexpected("enum_to_string", value))?;
                from.value_of(s).map(Value::Enum).ok_or_else(|| {
                    ConversionError::new(
                        "enum_to_string",
                        format!("`{s}` is not a variant of `{}`", from.name),
                    )
                })
            },
        )
    }

    /// Store a UUID as its hyphenated string form.
    pub fn uuid_to_string() -> Self {
        Self::new(
            "uuid_to_string",
            TypeDescriptor::Uuid,
            TypeDescriptor::String,
            |value| match value {
                Value::Uuid(u) => Ok(Value::String(u.hyphenated().to_string())),
                other => Err(unexpected("uuid_to_string", other)),
            },
            |value| {
                let s = value.as_str().ok_or_else(|| unexpected("uuid_to_string", value))?;
                uuid::Uuid::parse_str(s)
                    .map(Value::Uuid)
                    .map_err(|e| ConversionError::new("uuid_to_string", e.to_string()))
            },
        )
    }

    /// Store a boolean as `0` or `1`.
    pub fn bool_to_int() -> Self {
        Self::new(
            "bool_to_int",
            TypeDescriptor::Bool,
            TypeDescriptor::I32,
            |value| match value {
                Value::Bool(b) => Ok(Value::I32(i32::from(*b))),
                other => Err(unexpected("bool_to_int", other)),
            },
            |value| match value {
                Value::I32(n) => Ok(Value::Bool(*n != 0)),
                other => Err(unexpected("bool_to_int", other)),
            },
        )
    }
}

fn unexpected(converter: &str, value: &Value) -> ConversionError {
    ConversionError::new(converter, format!("unexpected {} value", value.kind_name()))
}

impl fmt::Debug for ValueConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueConverter")
            .field("name", &self.name)
            .field("model_type", &self.model_type)
            .field("provider_type", &self.provider_type)
            .finish_non_exhaustive()
    }
}
