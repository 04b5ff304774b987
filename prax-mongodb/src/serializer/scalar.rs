//! Fixed wire mappings for primitive types and enums.

use bson::oid::ObjectId;
use bson::spec::{BinarySubtype, ElementType};
use bson::{Binary, Bson, doc};
use chrono::{DateTime, FixedOffset, NaiveTime, SecondsFormat, Utc};
use prax_schema::{EnumType, TypeDescriptor, Value, WireRepresentation};

use super::numeric::{Number, RepresentationConverter};
use super::temporal::{
    TICKS_PER_MILLISECOND, datetime_to_ticks, duration_to_ticks, format_duration, parse_duration,
    ticks_to_datetime, ticks_to_duration, ticks_to_time, time_to_ticks,
};
use super::uuid_layout;
use super::{BsonSerializer, null_for_non_nullable, unexpected_bson, unexpected_value};
use crate::config::{EnumRepresentation, MappingConfig, UuidRepresentation};
use crate::error::{MongoError, MongoResult};

/// Serializer for a primitive type or enum, stored as a single wire type.
#[derive(Debug, Clone)]
pub struct ScalarSerializer {
    value_type: TypeDescriptor,
    bson_type: ElementType,
    converter: RepresentationConverter,
    uuid_representation: UuidRepresentation,
}

impl ScalarSerializer {
    /// Create a serializer using the default wire type for `ty`.
    pub fn new(ty: &TypeDescriptor, config: &MappingConfig) -> MongoResult<Self> {
        let bson_type = default_bson_type(ty, config)?;
        Ok(Self {
            value_type: ty.clone(),
            bson_type,
            converter: RepresentationConverter::default(),
            uuid_representation: config.uuid_representation,
        })
    }

    /// Create a serializer storing `ty` as an explicit wire representation.
    pub fn with_representation(
        ty: &TypeDescriptor,
        representation: &WireRepresentation,
        config: &MappingConfig,
    ) -> MongoResult<Self> {
        default_bson_type(ty, config)?;
        if !supports(ty, representation.bson_type) {
            return Err(MongoError::unsupported_representation(ty, representation));
        }
        Ok(Self {
            value_type: ty.clone(),
            bson_type: representation.bson_type,
            converter: RepresentationConverter::new(
                representation.allow_overflow,
                representation.allow_truncation,
            ),
            uuid_representation: config.uuid_representation,
        })
    }

    /// The wire type values are written as.
    pub fn bson_type(&self) -> ElementType {
        self.bson_type
    }

    fn enum_type(&self) -> MongoResult<&EnumType> {
        match &self.value_type {
            TypeDescriptor::Enum(e) => Ok(e),
            other => Err(MongoError::internal(format!("`{other}` is not an enum"))),
        }
    }

    fn uuid_layout(&self) -> UuidRepresentation {
        match (self.bson_type, self.uuid_representation) {
            (ElementType::String, _) => UuidRepresentation::String,
            (_, UuidRepresentation::String) => UuidRepresentation::Standard,
            (_, layout) => layout,
        }
    }

    fn serialize_datetime(&self, dt: &DateTime<Utc>) -> MongoResult<Bson> {
        Ok(match self.bson_type {
            ElementType::String => Bson::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ElementType::Int64 => Bson::Int64(datetime_to_ticks(&dt.naive_utc())?),
            _ => Bson::DateTime(bson::DateTime::from_chrono(*dt)),
        })
    }

    fn deserialize_datetime(&self, bson: &Bson) -> MongoResult<DateTime<Utc>> {
        match bson {
            Bson::DateTime(dt) => Ok(dt.to_chrono()),
            Bson::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| MongoError::serialization(format!("invalid date `{s}`: {e}"))),
            Bson::Int64(ticks) => Ok(ticks_to_datetime(*ticks)?.and_utc()),
            other => Err(unexpected_bson(&self.value_type, other)),
        }
    }

    fn serialize_offset(&self, dto: &DateTime<FixedOffset>) -> MongoResult<Bson> {
        let offset_minutes = dto.offset().local_minus_utc() / 60;
        if self.bson_type == ElementType::String {
            return Ok(Bson::String(dto.to_rfc3339_opts(SecondsFormat::AutoSi, false)));
        }
        let local_ticks = datetime_to_ticks(&dto.naive_local())?;
        Ok(match self.bson_type {
            ElementType::EmbeddedDocument => Bson::Document(doc! {
                "DateTime": bson::DateTime::from_chrono(dto.with_timezone(&Utc)),
                "Ticks": local_ticks,
                "Offset": offset_minutes,
            }),
            _ => Bson::Array(vec![Bson::Int64(local_ticks), Bson::Int32(offset_minutes)]),
        })
    }

    fn deserialize_offset(&self, bson: &Bson) -> MongoResult<DateTime<FixedOffset>> {
        let (ticks, minutes) = match bson {
            Bson::String(s) => {
                return DateTime::parse_from_rfc3339(s).map_err(|e| {
                    MongoError::serialization(format!("invalid date `{s}`: {e}"))
                });
            }
            Bson::Array(items) => match items.as_slice() {
                [Bson::Int64(ticks), Bson::Int32(minutes)] => (*ticks, *minutes),
                _ => {
                    return Err(MongoError::serialization(
                        "date with offset array must hold [ticks, offset minutes]",
                    ));
                }
            },
            Bson::Document(d) => match (d.get("Ticks"), d.get("Offset")) {
                (Some(Bson::Int64(ticks)), Some(Bson::Int32(minutes))) => (*ticks, *minutes),
                _ => {
                    return Err(MongoError::serialization(
                        "date with offset document must hold `Ticks` and `Offset`",
                    ));
                }
            },
            other => return Err(unexpected_bson(&self.value_type, other)),
        };
        let offset = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
            MongoError::serialization(format!("{minutes} minutes is not a valid UTC offset"))
        })?;
        ticks_to_datetime(ticks)?
            .and_local_timezone(offset)
            .single()
            .ok_or_else(|| MongoError::serialization("ambiguous local time"))
    }

    fn serialize_enum(&self, n: i64) -> MongoResult<Bson> {
        let enum_type = self.enum_type()?;
        match self.bson_type {
            ElementType::String => enum_type
                .name_of(n)
                .map(|name| Bson::String(name.to_string()))
                .ok_or_else(|| {
                    MongoError::serialization(format!(
                        "{n} is not a variant of `{}`",
                        enum_type.name
                    ))
                }),
            bson_type => self.converter.to_bson(Number::Integer(n.into()), bson_type),
        }
    }

    fn deserialize_enum(&self, bson: &Bson) -> MongoResult<Value> {
        let enum_type = self.enum_type()?;
        if let Bson::String(s) = bson {
            return enum_type.value_of(s).map(Value::Enum).ok_or_else(|| {
                MongoError::serialization(format!("`{s}` is not a variant of `{}`", enum_type.name))
            });
        }
        let n = Number::from_bson(bson, &enum_type.underlying)?
            .ok_or_else(|| unexpected_bson(&self.value_type, bson))?;
        let underlying = self.converter.to_value(n, &enum_type.underlying)?;
        underlying
            .as_i64()
            .map(Value::Enum)
            .ok_or_else(|| MongoError::serialization(format!("{n} overflows `{}`", enum_type.name)))
    }
}

impl BsonSerializer for ScalarSerializer {
    fn value_type(&self) -> &TypeDescriptor {
        &self.value_type
    }

    fn serialize(&self, value: &Value) -> MongoResult<Bson> {
        let ty = &self.value_type;
        match (ty, value) {
            (_, Value::Null) => Err(null_for_non_nullable(ty)),
            (TypeDescriptor::Bool, Value::Bool(b)) => Ok(Bson::Boolean(*b)),
            (TypeDescriptor::Char, Value::Char(c)) => Ok(match self.bson_type {
                ElementType::String => Bson::String(c.to_string()),
                _ => Bson::Int32(u32::from(*c) as i32),
            }),
            (TypeDescriptor::String, Value::String(s)) => match self.bson_type {
                ElementType::ObjectId => Ok(Bson::ObjectId(ObjectId::parse_str(s)?)),
                _ => Ok(Bson::String(s.clone())),
            },
            (TypeDescriptor::Bytes, Value::Bytes(bytes)) => Ok(Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: bytes.clone(),
            })),
            (TypeDescriptor::DateTime, Value::DateTime(dt)) => self.serialize_datetime(dt),
            (TypeDescriptor::DateTimeOffset, Value::DateTimeOffset(dto)) => {
                self.serialize_offset(dto)
            }
            (TypeDescriptor::Date, Value::Date(date)) => Ok(Bson::DateTime(
                bson::DateTime::from_chrono(date.and_time(NaiveTime::MIN).and_utc()),
            )),
            (TypeDescriptor::Time, Value::Time(time)) => Ok(Bson::Int64(time_to_ticks(time))),
            (TypeDescriptor::Duration, Value::Duration(duration)) => Ok(match self.bson_type {
                ElementType::Int64 => Bson::Int64(duration_to_ticks(duration)?),
                ElementType::Double => Bson::Double(
                    duration_to_ticks(duration)? as f64 / TICKS_PER_MILLISECOND as f64,
                ),
                _ => Bson::String(format_duration(duration)?),
            }),
            (TypeDescriptor::Uuid, Value::Uuid(uuid)) => {
                Ok(uuid_layout::encode(uuid, self.uuid_layout()))
            }
            (TypeDescriptor::ObjectId, Value::ObjectId(oid)) => Ok(match self.bson_type {
                ElementType::String => Bson::String(oid.to_hex()),
                _ => Bson::ObjectId(*oid),
            }),
            (TypeDescriptor::Enum(_), Value::Enum(n)) => self.serialize_enum(*n),
            (ty, value) if ty.is_numeric() && numeric_matches(ty, value) => {
                let n = Number::from_value(value).ok_or_else(|| unexpected_value(ty, value))?;
                self.converter.to_bson(n, self.bson_type)
            }
            (ty, value) => Err(unexpected_value(ty, value)),
        }
    }

    fn deserialize(&self, bson: &Bson) -> MongoResult<Value> {
        let ty = &self.value_type;
        match (ty, bson) {
            (_, Bson::Null) => Err(null_for_non_nullable(ty)),
            (TypeDescriptor::Bool, Bson::Boolean(b)) => Ok(Value::Bool(*b)),
            (TypeDescriptor::Char, Bson::Int32(code)) => u32::try_from(*code)
                .ok()
                .and_then(char::from_u32)
                .map(Value::Char)
                .ok_or_else(|| MongoError::serialization(format!("{code} is not a valid char"))),
            (TypeDescriptor::Char, Bson::String(s)) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(MongoError::serialization(format!(
                        "`{s}` is not a single char"
                    ))),
                }
            }
            (TypeDescriptor::String, Bson::String(s)) => Ok(Value::String(s.clone())),
            (TypeDescriptor::String, Bson::ObjectId(oid)) => Ok(Value::String(oid.to_hex())),
            (TypeDescriptor::Bytes, Bson::Binary(binary)) => Ok(Value::Bytes(binary.bytes.clone())),
            (TypeDescriptor::DateTime, bson) => {
                self.deserialize_datetime(bson).map(Value::DateTime)
            }
            (TypeDescriptor::DateTimeOffset, bson) => {
                self.deserialize_offset(bson).map(Value::DateTimeOffset)
            }
            (TypeDescriptor::Date, Bson::DateTime(dt)) => {
                let dt = dt.to_chrono();
                if dt.time() != NaiveTime::MIN {
                    return Err(MongoError::serialization(format!(
                        "{dt} is not a date at midnight UTC"
                    )));
                }
                Ok(Value::Date(dt.date_naive()))
            }
            (TypeDescriptor::Time, Bson::Int64(ticks)) => ticks_to_time(*ticks).map(Value::Time),
            (TypeDescriptor::Time, Bson::Int32(ticks)) => {
                ticks_to_time((*ticks).into()).map(Value::Time)
            }
            (TypeDescriptor::Duration, Bson::String(s)) => parse_duration(s).map(Value::Duration),
            (TypeDescriptor::Duration, Bson::Int64(ticks)) => {
                ticks_to_duration(*ticks).map(Value::Duration)
            }
            (TypeDescriptor::Duration, Bson::Int32(ticks)) => {
                ticks_to_duration((*ticks).into()).map(Value::Duration)
            }
            (TypeDescriptor::Duration, Bson::Double(ms)) => {
                let ticks = (ms * TICKS_PER_MILLISECOND as f64).round();
                if !ticks.is_finite() || ticks.abs() >= i64::MAX as f64 {
                    return Err(MongoError::serialization(format!(
                        "{ms} milliseconds is out of range"
                    )));
                }
                ticks_to_duration(ticks as i64).map(Value::Duration)
            }
            (TypeDescriptor::Uuid, bson) => {
                uuid_layout::decode(bson, self.uuid_representation).map(Value::Uuid)
            }
            (TypeDescriptor::ObjectId, Bson::ObjectId(oid)) => Ok(Value::ObjectId(*oid)),
            (TypeDescriptor::ObjectId, Bson::String(s)) => {
                Ok(Value::ObjectId(ObjectId::parse_str(s)?))
            }
            (TypeDescriptor::Enum(_), bson) => self.deserialize_enum(bson),
            (ty, bson) if ty.is_numeric() => {
                let n = Number::from_bson(bson, ty)?.ok_or_else(|| unexpected_bson(ty, bson))?;
                self.converter.to_value(n, ty)
            }
            (ty, bson) => Err(unexpected_bson(ty, bson)),
        }
    }
}

fn numeric_matches(ty: &TypeDescriptor, value: &Value) -> bool {
    matches!(
        (ty, value),
        (TypeDescriptor::I8, Value::I8(_))
            | (TypeDescriptor::U8, Value::U8(_))
            | (TypeDescriptor::I16, Value::I16(_))
            | (TypeDescriptor::U16, Value::U16(_))
            | (TypeDescriptor::I32, Value::I32(_))
            | (TypeDescriptor::U32, Value::U32(_))
            | (TypeDescriptor::I64, Value::I64(_))
            | (TypeDescriptor::U64, Value::U64(_))
            | (TypeDescriptor::F32, Value::F32(_))
            | (TypeDescriptor::F64, Value::F64(_))
            | (TypeDescriptor::Decimal, Value::Decimal(_))
    )
}

/// The wire type a primitive is stored as without an explicit representation.
fn default_bson_type(ty: &TypeDescriptor, config: &MappingConfig) -> MongoResult<ElementType> {
    Ok(match ty {
        TypeDescriptor::Bool => ElementType::Boolean,
        TypeDescriptor::I8
        | TypeDescriptor::U8
        | TypeDescriptor::I16
        | TypeDescriptor::U16
        | TypeDescriptor::I32
        | TypeDescriptor::Char => ElementType::Int32,
        TypeDescriptor::U32 | TypeDescriptor::I64 | TypeDescriptor::U64 => ElementType::Int64,
        TypeDescriptor::F32 | TypeDescriptor::F64 => ElementType::Double,
        TypeDescriptor::Decimal => ElementType::Decimal128,
        TypeDescriptor::String | TypeDescriptor::Duration => ElementType::String,
        TypeDescriptor::Bytes => ElementType::Binary,
        TypeDescriptor::DateTime | TypeDescriptor::Date => ElementType::DateTime,
        TypeDescriptor::DateTimeOffset => ElementType::Array,
        TypeDescriptor::Time => ElementType::Int64,
        TypeDescriptor::Uuid => match config.uuid_representation {
            UuidRepresentation::String => ElementType::String,
            _ => ElementType::Binary,
        },
        TypeDescriptor::ObjectId => ElementType::ObjectId,
        TypeDescriptor::Enum(e) => match (config.enum_representation, e.underlying.as_ref()) {
            (EnumRepresentation::String, _) => ElementType::String,
            (
                _,
                TypeDescriptor::I8
                | TypeDescriptor::U8
                | TypeDescriptor::I16
                | TypeDescriptor::U16
                | TypeDescriptor::I32,
            ) => ElementType::Int32,
            (_, underlying) if underlying.is_integral() => ElementType::Int64,
            (_, underlying) => {
                return Err(MongoError::unsupported_type(format!(
                    "{} (enum backed by {underlying})",
                    e.name
                )));
            }
        },
        other => return Err(MongoError::unsupported_type(other)),
    })
}

/// Whether `ty` can be stored as `bson_type`.
fn supports(ty: &TypeDescriptor, bson_type: ElementType) -> bool {
    use ElementType as E;
    match ty {
        ty if ty.is_numeric() => matches!(
            bson_type,
            E::Int32 | E::Int64 | E::Double | E::Decimal128 | E::String
        ),
        TypeDescriptor::Bool => bson_type == E::Boolean,
        TypeDescriptor::Char => matches!(bson_type, E::Int32 | E::String),
        TypeDescriptor::String => matches!(bson_type, E::String | E::ObjectId),
        TypeDescriptor::Bytes => bson_type == E::Binary,
        TypeDescriptor::DateTime => matches!(bson_type, E::DateTime | E::String | E::Int64),
        TypeDescriptor::DateTimeOffset => {
            matches!(bson_type, E::Array | E::EmbeddedDocument | E::String)
        }
        TypeDescriptor::Date => bson_type == E::DateTime,
        TypeDescriptor::Time => bson_type == E::Int64,
        TypeDescriptor::Duration => matches!(bson_type, E::String | E::Int64 | E::Double),
        TypeDescriptor::Uuid => matches!(bson_type, E::Binary | E::String),
        TypeDescriptor::ObjectId => matches!(bson_type, E::ObjectId | E::String),
        TypeDescriptor::Enum(_) => matches!(bson_type, E::Int32 | E::Int64 | E::String),
        _ => false,
    }
}
