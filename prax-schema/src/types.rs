//! Type descriptors for mapped members.
//!
//! A [`TypeDescriptor`] is the runtime description of the type a property,
//! navigation or projected value carries. Serializer resolution dispatches on
//! the descriptor's shape (primitive, array, nullable, dictionary, collection,
//! class-map fallback) instead of reflecting over host types.

use bson::spec::ElementType;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// The shape of a mapped value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// Boolean.
    Bool,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 64-bit integer.
    U64,
    /// Single precision float.
    F32,
    /// Double precision float.
    F64,
    /// High-precision decimal.
    Decimal,
    /// A single Unicode scalar value.
    Char,
    /// UTF-8 string.
    String,
    /// Byte sequence.
    Bytes,
    /// Instant in UTC.
    DateTime,
    /// Local clock time with a fixed UTC offset.
    DateTimeOffset,
    /// Calendar date without a time.
    Date,
    /// Time of day without a date.
    Time,
    /// Signed time span.
    Duration,
    /// 128-bit UUID.
    Uuid,
    /// Document store object identifier.
    ObjectId,
    /// An untyped sub-document passed through as-is.
    RawDocument,
    /// A user enum backed by an integral type.
    Enum(EnumType),
    /// An optional value of the inner type.
    Nullable(Box<TypeDescriptor>),
    /// A fixed array. Only rank one is mappable.
    Array {
        /// Element type.
        element: Box<TypeDescriptor>,
        /// Number of dimensions.
        rank: u8,
    },
    /// A single-type-argument collection.
    Collection {
        /// Requested collection shape.
        kind: CollectionKind,
        /// Element type.
        element: Box<TypeDescriptor>,
    },
    /// A key/value map.
    Dictionary {
        /// Requested map shape.
        kind: DictionaryKind,
        /// Key type.
        key: Box<TypeDescriptor>,
        /// Value type.
        value: Box<TypeDescriptor>,
    },
    /// A plain value type mapped field-by-field.
    Struct(StructType),
    /// A mapped entity type, by name.
    Entity(SmolStr),
    /// An unmapped reference type.
    Class(SmolStr),
    /// A generic type with an unrecognized shape.
    Generic {
        /// Generic type name.
        name: SmolStr,
        /// Type arguments.
        args: Vec<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    /// Wrap a type in [`TypeDescriptor::Nullable`]. Already nullable types are returned as-is.
    pub fn nullable(inner: TypeDescriptor) -> Self {
        match inner {
            Self::Nullable(_) => inner,
            other => Self::Nullable(Box::new(other)),
        }
    }

    /// A rank-one array of the given element type.
    pub fn array(element: TypeDescriptor) -> Self {
        Self::Array {
            element: Box::new(element),
            rank: 1,
        }
    }

    /// A concrete list of the given element type.
    pub fn list(element: TypeDescriptor) -> Self {
        Self::collection(CollectionKind::List, element)
    }

    /// A collection of the given shape.
    pub fn collection(kind: CollectionKind, element: TypeDescriptor) -> Self {
        Self::Collection {
            kind,
            element: Box::new(element),
        }
    }

    /// A concrete dictionary from `key` to `value`.
    pub fn dictionary(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::Dictionary {
            kind: DictionaryKind::Dictionary,
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// A reference to a mapped entity type.
    pub fn entity(name: impl Into<SmolStr>) -> Self {
        Self::Entity(name.into())
    }

    /// Check if this is a nullable wrapper.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }

    /// The wrapped type of a nullable wrapper.
    pub fn underlying_nullable(&self) -> Option<&TypeDescriptor> {
        match self {
            Self::Nullable(inner) => Some(inner),
            _ => None,
        }
    }

    /// Strip one nullable wrapper, if present.
    pub fn strip_nullable(&self) -> &TypeDescriptor {
        self.underlying_nullable().unwrap_or(self)
    }

    /// Check if this is one of the fixed primitive types.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::I8
                | Self::U8
                | Self::I16
                | Self::U16
                | Self::I32
                | Self::U32
                | Self::I64
                | Self::U64
                | Self::F32
                | Self::F64
                | Self::Decimal
                | Self::Char
                | Self::String
                | Self::Bytes
                | Self::DateTime
                | Self::DateTimeOffset
                | Self::Date
                | Self::Time
                | Self::Duration
                | Self::Uuid
                | Self::ObjectId
        )
    }

    /// Check if this is an integral numeric type.
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::U8
                | Self::I16
                | Self::U16
                | Self::I32
                | Self::U32
                | Self::I64
                | Self::U64
        )
    }

    /// Check if this is any numeric type.
    pub fn is_numeric(&self) -> bool {
        self.is_integral() || matches!(self, Self::F32 | Self::F64 | Self::Decimal)
    }

    /// Check if this is a sequence (array or collection).
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Array { .. } | Self::Collection { .. })
    }

    /// The element type of a sequence.
    pub fn sequence_element(&self) -> Option<&TypeDescriptor> {
        match self {
            Self::Array { element, .. } | Self::Collection { element, .. } => Some(element),
            _ => None,
        }
    }

    /// The entity name if this is an entity reference.
    pub fn entity_name(&self) -> Option<&str> {
        match self {
            Self::Entity(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::I8 => write!(f, "i8"),
            Self::U8 => write!(f, "u8"),
            Self::I16 => write!(f, "i16"),
            Self::U16 => write!(f, "u16"),
            Self::I32 => write!(f, "i32"),
            Self::U32 => write!(f, "u32"),
            Self::I64 => write!(f, "i64"),
            Self::U64 => write!(f, "u64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
            Self::Decimal => write!(f, "Decimal"),
            Self::Char => write!(f, "char"),
            Self::String => write!(f, "String"),
            Self::Bytes => write!(f, "Bytes"),
            Self::DateTime => write!(f, "DateTime"),
            Self::DateTimeOffset => write!(f, "DateTimeOffset"),
            Self::Date => write!(f, "Date"),
            Self::Time => write!(f, "Time"),
            Self::Duration => write!(f, "Duration"),
            Self::Uuid => write!(f, "Uuid"),
            Self::ObjectId => write!(f, "ObjectId"),
            Self::RawDocument => write!(f, "Document"),
            Self::Enum(e) => write!(f, "{}", e.name),
            Self::Nullable(inner) => write!(f, "Option<{inner}>"),
            Self::Array { element, rank: 1 } => write!(f, "[{element}]"),
            Self::Array { element, rank } => write!(f, "Array{rank}D<{element}>"),
            Self::Collection { kind, element } => write!(f, "{}<{element}>", kind.type_name()),
            Self::Dictionary { kind, key, value } => {
                write!(f, "{}<{key}, {value}>", kind.type_name())
            }
            Self::Struct(s) => write!(f, "{}", s.name),
            Self::Entity(name) | Self::Class(name) => write!(f, "{name}"),
            Self::Generic { name, args } => {
                write!(f, "{name}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
        }
    }
}

/// A user enum: a name, its integral backing type and its variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumType {
    /// Enum name.
    pub name: SmolStr,
    /// Integral backing type.
    pub underlying: Box<TypeDescriptor>,
    /// Variants as `(name, value)` pairs.
    pub variants: Vec<(SmolStr, i64)>,
}

impl EnumType {
    /// Create an enum backed by `i32`.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            underlying: Box::new(TypeDescriptor::I32),
            variants: vec![],
        }
    }

    /// Set the integral backing type.
    pub fn with_underlying(mut self, underlying: TypeDescriptor) -> Self {
        self.underlying = Box::new(underlying);
        self
    }

    /// Add a variant.
    pub fn variant(mut self, name: impl Into<SmolStr>, value: i64) -> Self {
        self.variants.push((name.into(), value));
        self
    }

    /// Look up the variant name for a value.
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.variants
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }

    /// Look up the value of a variant by name.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.variants
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// A plain value type mapped field-by-field when no primitive mapping exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructType {
    /// Type name.
    pub name: SmolStr,
    /// Fields in declaration order.
    pub fields: Vec<(SmolStr, TypeDescriptor)>,
}

impl StructType {
    /// Create a struct type with no fields.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            fields: vec![],
        }
    }

    /// Add a field.
    pub fn field(mut self, name: impl Into<SmolStr>, ty: TypeDescriptor) -> Self {
        self.fields.push((name.into(), ty));
        self
    }
}

/// The requested shape of a single-type-argument collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    /// Concrete growable list.
    List,
    /// Mutable list abstraction.
    MutableList,
    /// Mutable collection abstraction.
    MutableCollection,
    /// Any iterable sequence.
    Iterable,
    /// Read-only indexed view.
    ReadOnlyListView,
    /// Read-only counted view.
    ReadOnlyCollectionView,
    /// Concrete read-only collection wrapper.
    ReadOnlyCollection,
    /// A named subtype of the read-only collection wrapper.
    ReadOnlyCollectionSubtype(SmolStr),
    /// Concrete hash set.
    HashSet,
    /// Set abstraction.
    Set,
    /// Any other iterable-shaped type.
    Custom(SmolStr),
}

impl CollectionKind {
    /// The type name used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Self::List => "List",
            Self::MutableList => "MutableList",
            Self::MutableCollection => "MutableCollection",
            Self::Iterable => "Iterable",
            Self::ReadOnlyListView => "ReadOnlyListView",
            Self::ReadOnlyCollectionView => "ReadOnlyCollectionView",
            Self::ReadOnlyCollection => "ReadOnlyCollection",
            Self::ReadOnlyCollectionSubtype(name) | Self::Custom(name) => name,
            Self::HashSet => "HashSet",
            Self::Set => "Set",
        }
    }

    /// Check if the shape is one of the iterable abstractions that materialize to a list.
    pub fn is_interface(&self) -> bool {
        matches!(
            self,
            Self::MutableList
                | Self::MutableCollection
                | Self::Iterable
                | Self::ReadOnlyListView
                | Self::ReadOnlyCollectionView
        )
    }

    /// Check if the shape forbids mutation after materialization.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::ReadOnlyListView
                | Self::ReadOnlyCollectionView
                | Self::ReadOnlyCollection
                | Self::ReadOnlyCollectionSubtype(_)
        )
    }

    /// Check if the shape has set semantics.
    pub fn is_set(&self) -> bool {
        matches!(self, Self::HashSet | Self::Set)
    }
}

/// The requested shape of a key/value map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DictionaryKind {
    /// Concrete dictionary.
    Dictionary,
    /// Mutable map abstraction.
    MutableMap,
    /// Read-only map abstraction.
    ReadOnlyMapView,
    /// Concrete read-only dictionary wrapper.
    ReadOnlyDictionary,
    /// Any other map-shaped type.
    Custom(SmolStr),
}

impl DictionaryKind {
    /// The type name used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Dictionary => "Dictionary",
            Self::MutableMap => "MutableMap",
            Self::ReadOnlyMapView => "ReadOnlyMapView",
            Self::ReadOnlyDictionary => "ReadOnlyDictionary",
            Self::Custom(name) => name,
        }
    }

    /// Check if the shape can be stored as a document.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

/// An explicit wire representation override for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireRepresentation {
    /// Wire type to store the value as.
    pub bson_type: ElementType,
    /// Permit numeric conversions that overflow the target width.
    pub allow_overflow: bool,
    /// Permit numeric conversions that lose precision.
    pub allow_truncation: bool,
}

impl WireRepresentation {
    /// Store as the given wire type with strict conversions.
    pub fn new(bson_type: ElementType) -> Self {
        Self {
            bson_type,
            allow_overflow: false,
            allow_truncation: false,
        }
    }

    /// Permit overflowing conversions.
    pub fn allow_overflow(mut self) -> Self {
        self.allow_overflow = true;
        self
    }

    /// Permit truncating conversions.
    pub fn allow_truncation(mut self) -> Self {
        self.allow_truncation = true;
        self
    }
}

impl std::fmt::Display for WireRepresentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.bson_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_is_idempotent() {
        let ty = TypeDescriptor::nullable(TypeDescriptor::nullable(TypeDescriptor::I32));
        assert_eq!(ty, TypeDescriptor::Nullable(Box::new(TypeDescriptor::I32)));
        assert_eq!(ty.strip_nullable(), &TypeDescriptor::I32);
        assert_eq!(TypeDescriptor::I32.strip_nullable(), &TypeDescriptor::I32);
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeDescriptor::list(TypeDescriptor::String).to_string(), "List<String>");
        assert_eq!(
            TypeDescriptor::nullable(TypeDescriptor::I64).to_string(),
            "Option<i64>"
        );
        assert_eq!(
            TypeDescriptor::Array {
                element: Box::new(TypeDescriptor::I32),
                rank: 2
            }
            .to_string(),
            "Array2D<i32>"
        );
        assert_eq!(
            TypeDescriptor::dictionary(TypeDescriptor::String, TypeDescriptor::F64).to_string(),
            "Dictionary<String, f64>"
        );
        assert_eq!(
            TypeDescriptor::Generic {
                name: "Pair".into(),
                args: vec![TypeDescriptor::I32, TypeDescriptor::Bool],
            }
            .to_string(),
            "Pair<i32, bool>"
        );
    }

    #[test]
    fn test_enum_lookup() {
        let status = EnumType::new("Status").variant("Active", 1).variant("Closed", 2);
        assert_eq!(status.name_of(2), Some("Closed"));
        assert_eq!(status.value_of("Active"), Some(1));
        assert_eq!(status.name_of(9), None);
    }

    #[test]
    fn test_collection_kind_flags() {
        assert!(CollectionKind::Iterable.is_interface());
        assert!(!CollectionKind::List.is_interface());
        assert!(CollectionKind::ReadOnlyCollectionSubtype("Tags".into()).is_read_only());
        assert!(CollectionKind::HashSet.is_set());
        assert!(!DictionaryKind::Custom("Bag".into()).is_supported());
    }
}
