//! Entity projections and member binding.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;
use prax_schema::{EntityType, Model, Navigation, Property};
use smol_str::SmolStr;

use super::{
    ArrayAccessExpression, MongoExpression, ObjectAccessExpression, PropertyExpression,
    RootReferenceExpression,
};
use crate::error::{MongoError, MongoResult};

/// Identifies a member by the type that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberHandle {
    /// The declaring entity type.
    pub declaring_type: SmolStr,
    /// The member name.
    pub name: SmolStr,
}

impl MemberHandle {
    /// Create a member handle.
    pub fn new(declaring_type: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }
}

/// An entity type bound to the access path its documents are found at.
///
/// Navigation bindings are cached: binding the same navigation twice returns
/// the same child node.
#[derive(Debug)]
pub struct EntityProjectionExpression {
    entity: Arc<EntityType>,
    access: MongoExpression,
    model: Arc<Model>,
    navigations: Mutex<HashMap<MemberHandle, MongoExpression>>,
}

impl EntityProjectionExpression {
    /// Project `entity` from the documents `access` evaluates to.
    pub fn new(entity: Arc<EntityType>, access: MongoExpression, model: Arc<Model>) -> Self {
        Self {
            entity,
            access,
            model,
            navigations: Mutex::default(),
        }
    }

    /// Project `entity` from the queried documents themselves.
    pub fn root(entity: Arc<EntityType>, model: Arc<Model>) -> Arc<Self> {
        let root = RootReferenceExpression::new(Arc::clone(&entity));
        let access = MongoExpression::Root(Arc::new(root));
        Arc::new(Self::new(entity, access, model))
    }

    /// The projected entity type.
    pub fn entity(&self) -> &Arc<EntityType> {
        &self.entity
    }

    /// The access path.
    pub fn access(&self) -> &MongoExpression {
        &self.access
    }

    /// The model the entity belongs to.
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Members declared on a base or derived type can be bound; unrelated types cannot.
    fn check_binding(&self, declaring_type: &str, member: &str) -> MongoResult<()> {
        let entity = self.entity.name.as_str();
        if declaring_type == entity
            || self.model.is_assignable_from(entity, declaring_type)
            || self.model.is_assignable_from(declaring_type, entity)
        {
            Ok(())
        } else {
            Err(MongoError::unable_to_bind(member, declaring_type, entity))
        }
    }

    /// Bind a property of the projected entity.
    pub fn bind_property(
        self: &Arc<Self>,
        property: &Arc<Property>,
    ) -> MongoResult<MongoExpression> {
        self.check_binding(&property.declaring_type, &property.name)?;
        Ok(MongoExpression::Property(Arc::new(PropertyExpression::new(
            Arc::clone(property),
            MongoExpression::EntityProjection(Arc::clone(self)),
        ))))
    }

    /// Bind an embedded navigation of the projected entity.
    ///
    /// A single navigation binds to an entity projection over a sub-document
    /// access; a collection navigation binds to a sub-array access.
    pub fn bind_navigation(
        self: &Arc<Self>,
        navigation: &Arc<Navigation>,
    ) -> MongoResult<MongoExpression> {
        self.check_binding(&navigation.declaring_type, &navigation.name)?;

        let handle = MemberHandle::new(navigation.declaring_type.clone(), navigation.name.clone());
        let mut cache = self.navigations.lock();
        if let Some(bound) = cache.get(&handle) {
            return Ok(bound.clone());
        }

        let bound = if navigation.is_collection() {
            MongoExpression::ArrayAccess(Arc::new(ArrayAccessExpression::new(
                Arc::clone(navigation),
                self.access.clone(),
                Arc::clone(&self.model),
            )?))
        } else {
            let target = self.model.entity(&navigation.target).ok_or_else(|| {
                MongoError::internal(format!(
                    "navigation `{}.{}` targets unknown entity type `{}`",
                    navigation.declaring_type, navigation.name, navigation.target
                ))
            })?;
            let access = MongoExpression::ObjectAccess(Arc::new(ObjectAccessExpression::new(
                Arc::clone(navigation),
                self.access.clone(),
            )?));
            MongoExpression::EntityProjection(Arc::new(Self::new(
                Arc::clone(target),
                access,
                Arc::clone(&self.model),
            )))
        };
        cache.insert(handle, bound.clone());
        Ok(bound)
    }

    /// Bind a member by name, checking properties before navigations.
    ///
    /// Returns `None` if the entity has no member with that name.
    pub fn bind_member(self: &Arc<Self>, name: &str) -> MongoResult<Option<MongoExpression>> {
        if let Some(property) = self.entity.find_property(name) {
            return self.bind_property(property).map(Some);
        }
        if let Some(navigation) = self.entity.find_navigation(name) {
            return self.bind_navigation(navigation).map(Some);
        }
        Ok(None)
    }

    /// Bind a member identified by its declaring type.
    ///
    /// The declaring type may be a base or derived type of the projected entity.
    /// Returns `None` if the declaring type has no member with that name.
    pub fn bind_member_handle(
        self: &Arc<Self>,
        handle: &MemberHandle,
    ) -> MongoResult<Option<MongoExpression>> {
        let Some(declaring) = self.model.entity(&handle.declaring_type) else {
            return Ok(None);
        };
        if let Some(property) = declaring.find_property(&handle.name) {
            return self.bind_property(property).map(Some);
        }
        if let Some(navigation) = declaring.find_navigation(&handle.name) {
            return self.bind_navigation(navigation).map(Some);
        }
        Ok(None)
    }

    /// Rebuild over a new access path, keeping this node if the path is unchanged.
    pub fn update(self: &Arc<Self>, access: MongoExpression) -> Arc<Self> {
        if access.ptr_eq(&self.access) {
            return Arc::clone(self);
        }
        Arc::new(Self::new(
            Arc::clone(&self.entity),
            access,
            Arc::clone(&self.model),
        ))
    }
}

impl PartialEq for EntityProjectionExpression {
    fn eq(&self, other: &Self) -> bool {
        self.entity.name == other.entity.name && self.access == other.access
    }
}

impl Eq for EntityProjectionExpression {}

impl Hash for EntityProjectionExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.name.hash(state);
        self.access.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::fixtures;
    use pretty_assertions::assert_eq;

    fn root(entity: &str) -> Arc<EntityProjectionExpression> {
        let model = fixtures::model();
        let entity = Arc::clone(model.entity(entity).unwrap());
        EntityProjectionExpression::root(entity, model)
    }

    #[test]
    fn test_navigation_binding_is_cached() {
        let customer = root("Customer");
        let first = customer.bind_member("address").unwrap().unwrap();
        let second = customer.bind_member("address").unwrap().unwrap();
        assert!(first.ptr_eq(&second));

        let orders = customer.bind_member("orders").unwrap().unwrap();
        assert!(orders.ptr_eq(&customer.bind_member("orders").unwrap().unwrap()));
    }

    #[test]
    fn test_collection_navigation_binds_array_access() {
        let customer = root("Customer");
        let orders = customer.bind_member("orders").unwrap().unwrap();
        let array = orders.as_array_access().unwrap();

        let item = array.item_projection().unwrap();
        assert_eq!(item.entity().name, "OrderLine");
        assert!(Arc::ptr_eq(item, array.item_projection().unwrap()));

        let sku = item.bind_member("sku").unwrap().unwrap();
        assert_eq!(sku.dotted_path().as_deref(), Some("sku"));
    }

    #[test]
    fn test_nested_navigation_paths() {
        let customer = root("Customer");
        let address = customer.bind_member("address").unwrap().unwrap();
        let geo = address
            .as_entity_projection()
            .unwrap()
            .bind_member("geo")
            .unwrap()
            .unwrap();
        let lat = geo
            .as_entity_projection()
            .unwrap()
            .bind_member("lat")
            .unwrap()
            .unwrap();
        assert_eq!(lat.dotted_path().as_deref(), Some("address.geo.lat"));
    }

    #[test]
    fn test_unknown_member_is_not_found() {
        let customer = root("Customer");
        assert!(customer.bind_member("nope").unwrap().is_none());
        assert!(
            customer
                .bind_member_handle(&MemberHandle::new("Nowhere", "x"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_reference_navigation_is_not_embedded() {
        let customer = root("Customer");
        let err = customer.bind_member("referrer").unwrap_err();
        assert_eq!(
            err.to_string(),
            "navigation `Customer.referrer` does not point to an embedded entity type"
        );
    }

    #[test]
    fn test_binds_across_hierarchy() {
        let animal = root("Animal");
        let bark = animal
            .bind_member_handle(&MemberHandle::new("Dog", "bark"))
            .unwrap()
            .unwrap();
        assert_eq!(bark.dotted_path().as_deref(), Some("bark"));

        let dog = root("Dog");
        let kind = dog
            .bind_member_handle(&MemberHandle::new("Animal", "kind"))
            .unwrap()
            .unwrap();
        assert_eq!(kind.name(), Some("kind"));
    }

    #[test]
    fn test_unrelated_member_fails_to_bind() {
        let plant = root("Plant");
        let err = plant
            .bind_member_handle(&MemberHandle::new("Dog", "bark"))
            .unwrap_err();
        assert!(err.is_binding_error());
        insta::assert_snapshot!(
            err.to_string(),
            @"unable to bind member `Dog.bark` on entity type `Plant`"
        );
    }
}
