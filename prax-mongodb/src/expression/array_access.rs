//! Sub-array access through an embedded collection navigation.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use prax_schema::{Model, Navigation};
use smol_str::SmolStr;

use super::{EntityProjectionExpression, MongoExpression};
use crate::error::{MongoError, MongoResult};

/// The sub-array an embedded collection navigation is stored in.
///
/// The shape of one array element is an entity projection over a root
/// reference to the target type, built on first request.
#[derive(Debug)]
pub struct ArrayAccessExpression {
    navigation: Arc<Navigation>,
    element: SmolStr,
    parent: MongoExpression,
    model: Arc<Model>,
    item: OnceLock<Arc<EntityProjectionExpression>>,
}

impl ArrayAccessExpression {
    /// Access the collection `navigation` on the document `parent` evaluates to.
    pub fn new(
        navigation: Arc<Navigation>,
        parent: MongoExpression,
        model: Arc<Model>,
    ) -> MongoResult<Self> {
        let element = navigation.element_name.clone().ok_or_else(|| MongoError::NotEmbedded {
            navigation: format!("{}.{}", navigation.declaring_type, navigation.name),
        })?;
        Ok(Self {
            navigation,
            element,
            parent,
            model,
            item: OnceLock::new(),
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

    /// The projection describing one element of the array.
    pub fn item_projection(&self) -> MongoResult<&Arc<EntityProjectionExpression>> {
        if let Some(item) = self.item.get() {
            return Ok(item);
        }
        let target = self.model.entity(&self.navigation.target).ok_or_else(|| {
            MongoError::internal(format!(
                "navigation `{}.{}` targets unknown entity type `{}`",
                self.navigation.declaring_type, self.navigation.name, self.navigation.target
            ))
        })?;
        let built = EntityProjectionExpression::root(Arc::clone(target), Arc::clone(&self.model));
        Ok(self.item.get_or_init(|| built))
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
            model: Arc::clone(&self.model),
            item: OnceLock::new(),
        })
    }
}

impl PartialEq for ArrayAccessExpression {
    fn eq(&self, other: &Self) -> bool {
        self.navigation == other.navigation && self.parent == other.parent
    }
}

impl Eq for ArrayAccessExpression {}

impl Hash for ArrayAccessExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.navigation.hash(state);
        self.parent.hash(state);
    }
}
