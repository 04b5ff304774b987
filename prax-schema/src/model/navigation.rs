//! Navigations between entity types.

use smol_str::SmolStr;

use crate::types::{CollectionKind, TypeDescriptor};

/// A typed reference from one entity type to another, or to a collection of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Navigation {
    /// Navigation name.
    pub name: SmolStr,
    /// Entity type that declares the navigation. Set when the model is built.
    pub declaring_type: SmolStr,
    /// Target entity type.
    pub target: SmolStr,
    /// Collection shape, for collection navigations.
    pub collection: Option<CollectionKind>,
    /// Containing element name, for embedded targets.
    pub element_name: Option<SmolStr>,
    /// Whether a single-valued navigation must be present.
    pub is_required: bool,
}

impl Navigation {
    /// Create a reference navigation to a separately stored entity.
    pub fn new(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            declaring_type: SmolStr::default(),
            target: target.into(),
            collection: None,
            element_name: None,
            is_required: false,
        }
    }

    /// Create a navigation to an entity embedded under an element named after the navigation.
    pub fn embedded(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        let name = name.into();
        Self {
            element_name: Some(name.clone()),
            ..Self::new(name, target)
        }
    }

    /// Change the containing element name.
    pub fn with_element_name(mut self, element_name: impl Into<SmolStr>) -> Self {
        self.element_name = Some(element_name.into());
        self
    }

    /// Make this a collection navigation of the given shape.
    pub fn with_collection(mut self, kind: CollectionKind) -> Self {
        self.collection = Some(kind);
        self
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Check if the target is stored inside the owner's document.
    pub fn is_embedded(&self) -> bool {
        self.element_name.is_some()
    }

    /// Check if this is a collection navigation.
    pub fn is_collection(&self) -> bool {
        self.collection.is_some()
    }

    /// Type of the navigation value.
    pub fn type_descriptor(&self) -> TypeDescriptor {
        let target = TypeDescriptor::Entity(self.target.clone());
        match &self.collection {
            Some(kind) => TypeDescriptor::collection(kind.clone(), target),
            None if self.is_required => target,
            None => TypeDescriptor::nullable(target),
        }
    }
}
