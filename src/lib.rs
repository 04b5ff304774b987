//! # Prax DocMap
//!
//! Document mapping core for the Prax MongoDB provider.
//!
//! Prax DocMap provides:
//! - An immutable mapping metadata model (entity types, properties, navigations)
//! - Serializer resolution from member types to BSON wire serializers
//! - Value converters and explicit wire representations per property
//! - Projection expression trees and `$project` stage assembly
//! - Shapers that read typed values back out of returned documents
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use prax_docmap::prelude::*;
//!
//! let model = Arc::new(
//!     Model::builder()
//!         .entity(
//!             EntityTypeBuilder::new("User")
//!                 .collection("users")
//!                 .property(
//!                     Property::new("id", TypeDescriptor::ObjectId).with_element_name("_id"),
//!                 )
//!                 .property(Property::new("email", TypeDescriptor::String))
//!                 .key(["id"]),
//!         )
//!         .build()?,
//! );
//!
//! let entities = EntitySerializerCache::new(
//!     Arc::clone(&model),
//!     Arc::new(TypeSerializerResolver::default()),
//! );
//! let user = entities.get("User")?;
//! assert_eq!(user.try_resolve_member("id").unwrap().dotted_path(), "_id");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Mapping metadata model.
pub mod schema {
    pub use prax_schema::*;
}

/// Serializers, projection expressions and shaping for MongoDB.
pub mod mongodb {
    pub use prax_mongodb::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::mongodb::prelude::*;
    pub use crate::schema::{
        EntityType, EntityTypeBuilder, Model, Navigation, Property, TypeDescriptor, Value,
        ValueConverter, WireRepresentation,
    };
}

// Re-export key types at the crate root
pub use mongodb::{MappingConfig, MongoError, MongoResult};
pub use schema::{Model, SchemaError};
