//! Bound properties.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use prax_schema::Property;

use super::MongoExpression;

/// A property of an entity projection.
#[derive(Debug)]
pub struct PropertyExpression {
    property: Arc<Property>,
    projection: MongoExpression,
}

impl PropertyExpression {
    /// Bind `property` to the entity projection that holds it.
    pub fn new(property: Arc<Property>, projection: MongoExpression) -> Self {
        Self {
            property,
            projection,
        }
    }

    /// The property.
    pub fn property(&self) -> &Arc<Property> {
        &self.property
    }

    /// The projection the property was bound on.
    pub fn projection(&self) -> &MongoExpression {
        &self.projection
    }

    /// Rebuild over a new projection, keeping this node if it is unchanged.
    pub fn update(self: &Arc<Self>, projection: MongoExpression) -> Arc<Self> {
        if projection.ptr_eq(&self.projection) {
            return Arc::clone(self);
        }
        Arc::new(Self::new(Arc::clone(&self.property), projection))
    }
}

impl PartialEq for PropertyExpression {
    fn eq(&self, other: &Self) -> bool {
        self.property.declaring_type == other.property.declaring_type
            && self.property.name == other.property.name
            && self.projection == other.projection
    }
}

impl Eq for PropertyExpression {}

impl Hash for PropertyExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.property.declaring_type.hash(state);
        self.property.name.hash(state);
        self.projection.hash(state);
    }
}
