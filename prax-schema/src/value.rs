//! Dynamic runtime values.
//!
//! [`Value`] is what serializers read from and write to: one variant per
//! primitive [`TypeDescriptor`](crate::TypeDescriptor), plus containers for
//! sequences, string-keyed maps, field-wise structs and raw sub-documents.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// A runtime value of a mapped type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value of a nullable type.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 8-bit integer.
    I8(i8),
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Signed 16-bit integer.
    I16(i16),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Single precision float.
    F32(f32),
    /// Double precision float.
    F64(f64),
    /// High-precision decimal.
    Decimal(Decimal),
    /// Unicode scalar value.
    Char(char),
    /// UTF-8 string.
    String(String),
    /// Byte sequence.
    Bytes(Vec<u8>),
    /// Instant in UTC.
    DateTime(DateTime<Utc>),
    /// Local clock time with a fixed offset.
    DateTimeOffset(DateTime<FixedOffset>),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Signed time span.
    Duration(TimeDelta),
    /// UUID.
    Uuid(uuid::Uuid),
    /// Object identifier.
    ObjectId(bson::oid::ObjectId),
    /// Enum, by underlying integral value.
    Enum(i64),
    /// Ordered sequence.
    List(Vec<Value>),
    /// String-keyed map.
    Map(IndexMap<String, Value>),
    /// Field-wise struct.
    Struct(IndexMap<SmolStr, Value>),
    /// Raw sub-document.
    Document(bson::Document),
}

impl Value {
    /// Check if this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::U8(_) => "u8",
            Self::I16(_) => "i16",
            Self::U16(_) => "u16",
            Self::I32(_) => "i32",
            Self::U32(_) => "u32",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Decimal(_) => "Decimal",
            Self::Char(_) => "char",
            Self::String(_) => "String",
            Self::Bytes(_) => "Bytes",
            Self::DateTime(_) => "DateTime",
            Self::DateTimeOffset(_) => "DateTimeOffset",
            Self::Date(_) => "Date",
            Self::Time(_) => "Time",
            Self::Duration(_) => "Duration",
            Self::Uuid(_) => "Uuid",
            Self::ObjectId(_) => "ObjectId",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
            Self::Document(_) => "document",
        }
    }

    /// Borrow the string contents.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the sequence elements.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Widen any integral value to `i64`. `U64` values above `i64::MAX` yield `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I8(v) => Some(v.into()),
            Self::U8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::I64(v) | Self::Enum(v) => Some(v),
            Self::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    char => Char,
    String => String,
    Vec<u8> => Bytes,
    DateTime<Utc> => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    NaiveDate => Date,
    NaiveTime => Time,
    TimeDelta => Duration,
    uuid::Uuid => Uuid,
    bson::oid::ObjectId => ObjectId,
    bson::Document => Document,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::List(iter.into_iter().map(Into::into).collect())
    }
}
