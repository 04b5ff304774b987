//! Scalar properties of an entity type.

use smol_str::SmolStr;

use crate::converter::ValueConverter;
use crate::types::{TypeDescriptor, WireRepresentation};

/// The element under which a multi-property key is stored.
pub const ID_ELEMENT: &str = "_id";

/// A scalar property of an entity type.
#[derive(Debug, Clone)]
pub struct Property {
    /// Property name.
    pub name: SmolStr,
    /// Entity type that declares the property. Set when the model is built.
    pub declaring_type: SmolStr,
    /// Property type.
    pub type_descriptor: TypeDescriptor,
    /// Name of the document element the value is stored in.
    pub element_name: SmolStr,
    /// Shadow properties are tracked but never stored.
    pub is_shadow: bool,
    /// Part of the primary key. Set when the model is built.
    pub is_key: bool,
    /// Part of a primary key spanning more than one property. Set when the model is built.
    pub in_composite_key: bool,
    /// Converter applied before storage.
    pub converter: Option<ValueConverter>,
    /// Explicit wire representation.
    pub representation: Option<WireRepresentation>,
}

impl Property {
    /// Create a property stored under its own name.
    pub fn new(name: impl Into<SmolStr>, type_descriptor: TypeDescriptor) -> Self {
        let name = name.into();
        Self {
            element_name: name.clone(),
            name,
            declaring_type: SmolStr::default(),
            type_descriptor,
            is_shadow: false,
            is_key: false,
            in_composite_key: false,
            converter: None,
            representation: None,
        }
    }

    /// Store the property under a different element name.
    pub fn with_element_name(mut self, element_name: impl Into<SmolStr>) -> Self {
        self.element_name = element_name.into();
        self
    }

    /// Mark as a shadow property.
    pub fn shadow(mut self) -> Self {
        self.is_shadow = true;
        self
    }

    /// Attach a value converter.
    pub fn with_converter(mut self, converter: ValueConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Attach an explicit wire representation.
    pub fn with_representation(mut self, representation: WireRepresentation) -> Self {
        self.representation = Some(representation);
        self
    }

    /// Check if the property type admits null.
    pub fn is_nullable(&self) -> bool {
        self.type_descriptor.is_nullable()
    }

    /// Check if the property is written to the document.
    pub fn is_stored(&self) -> bool {
        !self.is_shadow
    }

    /// Path of the element holding the value, from the document root.
    ///
    /// Members of a multi-property key live one level down, inside `_id`.
    pub fn stored_path(&self) -> Vec<SmolStr> {
        if self.in_composite_key {
            vec![SmolStr::new_static(ID_ELEMENT), self.element_name.clone()]
        } else {
            vec![self.element_name.clone()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_path() {
        let mut prop = Property::new("tenant", TypeDescriptor::String).with_element_name("t");
        assert_eq!(prop.stored_path(), vec![SmolStr::new("t")]);

        prop.in_composite_key = true;
        assert_eq!(prop.stored_path(), vec![SmolStr::new("_id"), SmolStr::new("t")]);
    }

    #[test]
    fn test_nullable_follows_descriptor() {
        let prop = Property::new("age", TypeDescriptor::nullable(TypeDescriptor::I32));
        assert!(prop.is_nullable());
        assert!(!Property::new("age", TypeDescriptor::I32).is_nullable());
    }
}
