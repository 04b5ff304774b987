//! Sub-document access through an embedded single navigation.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use prax_schema::Navigation;
use smol_str::SmolStr;

use super::MongoExpression;
use crate::error::{MongoError, MongoResult};

/// The sub-document an embedded navigation is stored in.
#[derive(Debug)]
pub struct ObjectAccessExpression {
    navigation: Arc<Navigation>,
    element: SmolStr,
    parent: MongoExpression,
}

impl ObjectAccessExpression {
    /// Access `navigation` on the document `parent` evaluates to.
    ///
    /// Fails if the navigation does not point to an embedded entity type.
    pub fn new(navigation: Arc<Navigation>, parent: MongoExpression) -> MongoResult<Self> {
        let element = navigation.element_name.clone().ok_or_else(|| MongoError::NotEmbedded {
            navigation: format!("{}.{}", navigation.declaring_type, navigation.name),
        })?;
        Ok(Self {
            navigation,
            element,
            parent,
        })
    }

    /// The navigation.
    pub fn navigation(&self) -> &Arc<Navigation> {
        &self.navigation
    }

    /// The containing element name.
    pub fn element(&self) -> &str {
        &self.element
    }

    pub(crate) fn element_name(&self) -> &SmolStr {
        &self.element
    }

    /// The expression for the containing document.
    pub fn parent(&self) -> &MongoExpression {
        &self.parent
    }

    /// Rebuild over a new parent, keeping this node if the parent is unchanged.
    pub fn update(self: &Arc<Self>, parent: MongoExpression) -> Arc<Self> {
        if parent.ptr_eq(&self.parent) {
            return Arc::clone(self);
        }
        Arc::new(Self {
            navigation: Arc::clone(&self.navigation),
            element: self.element.clone(),
            parent,
        })
    }
}

impl PartialEq for ObjectAccessExpression {
    fn eq(&self, other: &Self) -> bool {
        self.navigation == other.navigation && self.parent == other.parent
    }
}

impl Eq for ObjectAccessExpression {}

impl Hash for ObjectAccessExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.navigation.hash(state);
        self.parent.hash(state);
    }
}
