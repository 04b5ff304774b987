//! # prax-mongodb
//!
//! Document mapping core for the Prax MongoDB provider.
//!
//! This crate provides:
//! - Serializer resolution from type descriptors to BSON wire serializers
//! - Value converter and wire representation layering per property
//! - Entity serializers for member-level path resolution
//! - Projection expression trees with structural equality
//! - Per-query projection assembly into `$project` stages
//! - Shapers that read typed values back out of returned documents
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use prax_mongodb::prelude::*;
//! use prax_schema::{EntityTypeBuilder, Model, Property, TypeDescriptor};
//!
//! let model = Arc::new(
//!     Model::builder()
//!         .entity(
//!             EntityTypeBuilder::new("Customer")
//!                 .collection("customers")
//!                 .property(Property::new("id", TypeDescriptor::I32).with_element_name("_id"))
//!                 .property(Property::new("name", TypeDescriptor::String))
//!                 .key(["id"]),
//!         )
//!         .build()?,
//! );
//! let entities = EntitySerializerCache::new(
//!     Arc::clone(&model),
//!     Arc::new(TypeSerializerResolver::new(MappingConfig::default())),
//! );
//!
//! let mut query = QueryExpression::new(Arc::clone(&model), "Customer")?;
//! let root = query.get_mapped_projection(&ProjectionMember::root())?.clone();
//! let name = root.as_entity_projection().unwrap().bind_member("name")?.unwrap();
//! let index = query.add_to_projection(name, None);
//!
//! assert_eq!(query.to_project_stage()?, doc! { "$project": { "name": "$name" } });
//!
//! let shaper = ShaperExpression::for_projection_entry(&query, index, &entities)?;
//! let shaped = shaper.evaluate(&doc! { "name": "Ada" })?;
//! assert_eq!(shaped.into_value(), Some("Ada".into()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod expression;
pub mod query;
pub mod serializer;
pub mod shaping;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use config::{EnumRepresentation, MappingConfig, MappingConfigBuilder, UuidRepresentation};
pub use error::{ErrorKind, MongoError, MongoResult};
pub use expression::{EntityProjectionExpression, ExpressionVisitor, MongoExpression};
pub use query::{ProjectionEntry, ProjectionMapping, ProjectionMember, QueryExpression};
pub use serializer::{
    BsonSerializer, CacheStats, EntitySerializer, EntitySerializerCache, SerializationInfo,
    SharedSerializer, TypeSerializerResolver,
};
pub use shaping::{Shaped, ShaperExpression};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{MappingConfig, MappingConfigBuilder};
    pub use crate::document::DocumentExt;
    pub use crate::error::{MongoError, MongoResult};
    pub use crate::expression::{EntityProjectionExpression, MongoExpression};
    pub use crate::query::{ProjectionMember, QueryExpression};
    pub use crate::serializer::{
        BsonSerializer, EntitySerializerCache, SharedSerializer, TypeSerializerResolver,
    };
    pub use crate::shaping::{Shaped, ShaperExpression};
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
}
