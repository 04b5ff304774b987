//! The root reference.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use prax_schema::EntityType;

/// The document being queried, typed as an entity.
#[derive(Debug)]
pub struct RootReferenceExpression {
    entity: Arc<EntityType>,
}

impl RootReferenceExpression {
    /// Create a root reference.
    pub fn new(entity: Arc<EntityType>) -> Self {
        Self { entity }
    }

    /// The entity type of the queried documents.
    pub fn entity(&self) -> &Arc<EntityType> {
        &self.entity
    }
}

impl PartialEq for RootReferenceExpression {
    fn eq(&self, other: &Self) -> bool {
        self.entity.name == other.entity.name
    }
}

impl Eq for RootReferenceExpression {}

impl Hash for RootReferenceExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.name.hash(state);
    }
}
