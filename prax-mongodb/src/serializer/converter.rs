//! Serializers that run a value converter in front of a provider serializer.

use bson::Bson;
use prax_schema::{TypeDescriptor, Value, ValueConverter};

use super::{BsonSerializer, SharedSerializer};
use crate::error::{MongoError, MongoResult};

/// Serializes a model value by converting it to the provider type and delegating.
#[derive(Debug, Clone)]
pub struct ValueConverterSerializer {
    value_type: TypeDescriptor,
    converter: ValueConverter,
    provider: SharedSerializer,
    handles_null: bool,
}

impl ValueConverterSerializer {
    /// Bridge a converter to the serializer for its provider type.
    ///
    /// Fails if the converter's model type is nullable.
    pub fn new(converter: ValueConverter, provider: SharedSerializer) -> MongoResult<Self> {
        check_model_type(&converter)?;
        Ok(Self {
            value_type: converter.model_type.clone(),
            converter,
            provider,
            handles_null: false,
        })
    }

    /// Bridge a converter whose provider type is nullable, for a nullable model value.
    ///
    /// Null passes through on both sides without reaching the converter, so the
    /// model and provider sides are each unwrapped exactly once.
    pub fn nullable(converter: ValueConverter, provider: SharedSerializer) -> MongoResult<Self> {
        check_model_type(&converter)?;
        Ok(Self {
            value_type: TypeDescriptor::nullable(converter.model_type.clone()),
            converter,
            provider,
            handles_null: true,
        })
    }

    /// The converter being bridged.
    pub fn converter(&self) -> &ValueConverter {
        &self.converter
    }
}

fn check_model_type(converter: &ValueConverter) -> MongoResult<()> {
    match converter.model_type.underlying_nullable() {
        Some(inner) => Err(MongoError::InvalidConverter {
            converter: converter.name.to_string(),
            model_type: converter.model_type.to_string(),
            inner_type: inner.to_string(),
        }),
        None => Ok(()),
    }
}

impl BsonSerializer for ValueConverterSerializer {
    fn value_type(&self) -> &TypeDescriptor {
        &self.value_type
    }

    fn serialize(&self, value: &Value) -> MongoResult<Bson> {
        if self.handles_null && value.is_null() {
            return Ok(Bson::Null);
        }
        let provided = self.converter.to_provider(value)?;
        self.provider.serialize(&provided)
    }

    fn deserialize(&self, bson: &Bson) -> MongoResult<Value> {
        if self.handles_null && matches!(bson, Bson::Null) {
            return Ok(Value::Null);
        }
        let provided = self.provider.deserialize(bson)?;
        Ok(self.converter.from_provider(&provided)?)
    }
}
