//! # prax-schema
//!
//! Finalized mapping metadata for the Prax document provider.
//!
//! This crate provides:
//! - Type descriptors for every mappable member type
//! - Dynamic runtime values read and written by serializers
//! - Bidirectional value converters and wire representation overrides
//! - Entity types, properties and navigations, built and validated into an
//!   immutable [`Model`]
//!
//! ## Example
//!
//! ```rust
//! use prax_schema::{EntityTypeBuilder, Model, Property, TypeDescriptor};
//!
//! let model = Model::builder()
//!     .entity(
//!         EntityTypeBuilder::new("Customer")
//!             .collection("customers")
//!             .property(Property::new("id", TypeDescriptor::ObjectId).with_element_name("_id"))
//!             .property(Property::new("name", TypeDescriptor::String))
//!             .key(["id"]),
//!     )
//!     .build()?;
//!
//! assert_eq!(model.entity("Customer").unwrap().stored_key_names(), vec!["_id"]);
//! # Ok::<(), prax_schema::SchemaError>(())
//! ```

pub mod converter;
pub mod error;
pub mod model;
pub mod types;
pub mod value;

pub use converter::{ConversionError, ValueConverter};
pub use error::{SchemaError, SchemaResult};
pub use model::{
    EntityType, EntityTypeBuilder, ID_ELEMENT, Model, ModelBuilder, Navigation, Property,
};
pub use types::{
    CollectionKind, DictionaryKind, EnumType, StructType, TypeDescriptor, WireRepresentation,
};
pub use value::Value;
