//! Access-path expressions over mapped documents.
//!
//! A query's projection is described by a tree of [`MongoExpression`] nodes:
//! a root reference to the queried entity type, sub-document and sub-array
//! accesses through embedded navigations, entity projections binding an entity
//! type to an access path, and bound properties.
//!
//! Nodes are immutable and shared through `Arc`. Equality and hashing are
//! structural, so two independently built nodes describing the same logical
//! path compare equal; projection assembly relies on this to deduplicate.
//!
//! ```rust
//! use std::sync::Arc;
//! use prax_mongodb::expression::{EntityProjectionExpression, MongoExpression};
//! use prax_schema::{EntityTypeBuilder, Model, Navigation, Property, TypeDescriptor};
//!
//! let model = Arc::new(
//!     Model::builder()
//!         .entity(
//!             EntityTypeBuilder::new("Customer")
//!                 .property(Property::new("id", TypeDescriptor::I32))
//!                 .navigation(Navigation::embedded("address", "Address"))
//!                 .key(["id"]),
//!         )
//!         .entity(
//!             EntityTypeBuilder::owned("Address")
//!                 .property(Property::new("city", TypeDescriptor::String)),
//!         )
//!         .build()?,
//! );
//!
//! let customer = Arc::clone(model.entity("Customer").unwrap());
//! let root = EntityProjectionExpression::root(customer, Arc::clone(&model));
//! let address = root.bind_member("address")?.unwrap();
//! let city = address.as_entity_projection().unwrap().bind_member("city")?.unwrap();
//!
//! assert_eq!(city.dotted_path().as_deref(), Some("address.city"));
//! assert!(Arc::ptr_eq(
//!     root.bind_member("address")?.unwrap().as_entity_projection().unwrap(),
//!     address.as_entity_projection().unwrap(),
//! ));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod array_access;
mod entity_projection;
mod object_access;
mod property;
mod root;
mod visitor;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smol_str::SmolStr;

pub use array_access::ArrayAccessExpression;
pub use entity_projection::{EntityProjectionExpression, MemberHandle};
pub use object_access::ObjectAccessExpression;
pub use property::PropertyExpression;
pub use root::RootReferenceExpression;
pub use visitor::ExpressionVisitor;

/// A node in a projection tree.
#[derive(Debug, Clone)]
pub enum MongoExpression {
    /// The queried document itself.
    Root(Arc<RootReferenceExpression>),
    /// A sub-document reached through an embedded single navigation.
    ObjectAccess(Arc<ObjectAccessExpression>),
    /// A sub-array reached through an embedded collection navigation.
    ArrayAccess(Arc<ArrayAccessExpression>),
    /// An entity type bound to an access path.
    EntityProjection(Arc<EntityProjectionExpression>),
    /// A property of a projected entity.
    Property(Arc<PropertyExpression>),
    /// A placeholder for a finalized projection entry.
    ProjectionIndex(usize),
}

impl MongoExpression {
    /// The path-derived name, used as the default projection alias.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Root(_) | Self::ProjectionIndex(_) => None,
            Self::ObjectAccess(e) => Some(e.element()),
            Self::ArrayAccess(e) => Some(e.element()),
            Self::EntityProjection(e) => e.access().name(),
            Self::Property(e) => Some(e.property().name.as_str()),
        }
    }

    /// Element names from the queried document down to this node's value.
    ///
    /// The root has an empty path. Projection placeholders have none.
    pub fn field_path(&self) -> Option<Vec<SmolStr>> {
        match self {
            Self::Root(_) => Some(Vec::new()),
            Self::ObjectAccess(e) => e.parent().field_path().map(|mut path| {
                path.push(e.element_name().clone());
                path
            }),
            Self::ArrayAccess(e) => e.parent().field_path().map(|mut path| {
                path.push(e.element_name().clone());
                path
            }),
            Self::EntityProjection(e) => e.access().field_path(),
            Self::Property(e) => e.projection().field_path().map(|mut path| {
                path.extend(e.property().stored_path());
                path
            }),
            Self::ProjectionIndex(_) => None,
        }
    }

    /// The field path joined with dots. Empty for the root.
    pub fn dotted_path(&self) -> Option<String> {
        self.field_path().map(|path| path.join("."))
    }

    /// The single child node, if any.
    pub fn child(&self) -> Option<&MongoExpression> {
        match self {
            Self::Root(_) | Self::ProjectionIndex(_) => None,
            Self::ObjectAccess(e) => Some(e.parent()),
            Self::ArrayAccess(e) => Some(e.parent()),
            Self::EntityProjection(e) => Some(e.access()),
            Self::Property(e) => Some(e.projection()),
        }
    }

    /// Rebuild this node over a new child.
    ///
    /// Returns a clone of `self` sharing the same node when `child` is the
    /// current child, so unchanged subtrees are never copied.
    pub fn with_child(&self, child: MongoExpression) -> MongoExpression {
        match self {
            Self::Root(_) | Self::ProjectionIndex(_) => self.clone(),
            Self::ObjectAccess(e) => Self::ObjectAccess(e.update(child)),
            Self::ArrayAccess(e) => Self::ArrayAccess(e.update(child)),
            Self::EntityProjection(e) => Self::EntityProjection(e.update(child)),
            Self::Property(e) => Self::Property(e.update(child)),
        }
    }

    /// Check if both expressions are the same node.
    pub fn ptr_eq(&self, other: &MongoExpression) -> bool {
        match (self, other) {
            (Self::Root(a), Self::Root(b)) => Arc::ptr_eq(a, b),
            (Self::ObjectAccess(a), Self::ObjectAccess(b)) => Arc::ptr_eq(a, b),
            (Self::ArrayAccess(a), Self::ArrayAccess(b)) => Arc::ptr_eq(a, b),
            (Self::EntityProjection(a), Self::EntityProjection(b)) => Arc::ptr_eq(a, b),
            (Self::Property(a), Self::Property(b)) => Arc::ptr_eq(a, b),
            (Self::ProjectionIndex(a), Self::ProjectionIndex(b)) => a == b,
            _ => false,
        }
    }

    /// The entity projection, if this is one.
    pub fn as_entity_projection(&self) -> Option<&Arc<EntityProjectionExpression>> {
        match self {
            Self::EntityProjection(e) => Some(e),
            _ => None,
        }
    }

    /// The array access, if this is one.
    pub fn as_array_access(&self) -> Option<&Arc<ArrayAccessExpression>> {
        match self {
            Self::ArrayAccess(e) => Some(e),
            _ => None,
        }
    }

    /// The bound property, if this is one.
    pub fn as_property(&self) -> Option<&Arc<PropertyExpression>> {
        match self {
            Self::Property(e) => Some(e),
            _ => None,
        }
    }
}

impl PartialEq for MongoExpression {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self, other) {
            (Self::Root(a), Self::Root(b)) => a == b,
            (Self::ObjectAccess(a), Self::ObjectAccess(b)) => a == b,
            (Self::ArrayAccess(a), Self::ArrayAccess(b)) => a == b,
            (Self::EntityProjection(a), Self::EntityProjection(b)) => a == b,
            (Self::Property(a), Self::Property(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for MongoExpression {}

impl Hash for MongoExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Root(e) => e.hash(state),
            Self::ObjectAccess(e) => e.hash(state),
            Self::ArrayAccess(e) => e.hash(state),
            Self::EntityProjection(e) => e.hash(state),
            Self::Property(e) => e.hash(state),
            Self::ProjectionIndex(i) => i.hash(state),
        }
    }
}

impl fmt::Display for MongoExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProjectionIndex(i) => write!(f, "projection[{i}]"),
            Self::Root(e) => write!(f, "$$ROOT<{}>", e.entity().name),
            other => match other.dotted_path() {
                Some(path) => write!(f, "${path}"),
                None => write!(f, "<unbound>"),
            },
        }
    }
}
