//! Numeric conversions between model types and wire representations.

use bson::Bson;
use prax_schema::{TypeDescriptor, Value};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::decimal128::{decimal_from_decimal128, decimal_to_decimal128};
use crate::error::{MongoError, MongoResult};

/// A number lifted out of either a runtime value or a wire value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Integer(i128),
    Float(f64),
    Decimal(Decimal),
}

impl Number {
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        Some(match *value {
            Value::I8(v) => Self::Integer(v.into()),
            Value::U8(v) => Self::Integer(v.into()),
            Value::I16(v) => Self::Integer(v.into()),
            Value::U16(v) => Self::Integer(v.into()),
            Value::I32(v) => Self::Integer(v.into()),
            Value::U32(v) => Self::Integer(v.into()),
            Value::I64(v) | Value::Enum(v) => Self::Integer(v.into()),
            Value::U64(v) => Self::Integer(v.into()),
            Value::Char(c) => Self::Integer(u32::from(c).into()),
            Value::F32(v) => Self::Float(v.into()),
            Value::F64(v) => Self::Float(v),
            Value::Decimal(d) => Self::Decimal(d),
            _ => return None,
        })
    }

    /// Lift a wire number. Strings are parsed according to the model type.
    pub(crate) fn from_bson(bson: &Bson, ty: &TypeDescriptor) -> MongoResult<Option<Self>> {
        Ok(Some(match bson {
            Bson::Int32(v) => Self::Integer((*v).into()),
            Bson::Int64(v) => Self::Integer((*v).into()),
            Bson::Double(v) => Self::Float(*v),
            Bson::Decimal128(d) => Self::Decimal(decimal_from_decimal128(d)?),
            Bson::String(s) => Self::parse(s, ty)?,
            _ => return Ok(None),
        }))
    }

    fn parse(s: &str, ty: &TypeDescriptor) -> MongoResult<Self> {
        let invalid = || MongoError::serialization(format!("`{s}` is not a valid `{ty}`"));
        match ty {
            TypeDescriptor::F32 | TypeDescriptor::F64 => {
                s.parse::<f64>().map(Self::Float).map_err(|_| invalid())
            }
            TypeDescriptor::Decimal => {
                s.parse::<Decimal>().map(Self::Decimal).map_err(|_| invalid())
            }
            _ => s.parse::<i128>().map(Self::Integer).map_err(|_| invalid()),
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
        }
    }
}

/// Checked numeric conversions governed by overflow and truncation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RepresentationConverter {
    pub(crate) allow_overflow: bool,
    pub(crate) allow_truncation: bool,
}

macro_rules! integral_conversion {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name(&self, n: Number) -> MongoResult<$ty> {
            let wide = self.to_i128(n, stringify!($ty))?;
            match <$ty>::try_from(wide) {
                Ok(v) => Ok(v),
                Err(_) if self.allow_overflow => Ok(wide as $ty),
                Err(_) => Err(overflow(n, stringify!($ty))),
            }
        }
    };
}

impl RepresentationConverter {
    pub(crate) fn new(allow_overflow: bool, allow_truncation: bool) -> Self {
        Self {
            allow_overflow,
            allow_truncation,
        }
    }

    integral_conversion!(to_i8, i8);
    integral_conversion!(to_u8, u8);
    integral_conversion!(to_i16, i16);
    integral_conversion!(to_u16, u16);
    integral_conversion!(to_i32, i32);
    integral_conversion!(to_u32, u32);
    integral_conversion!(to_i64, i64);
    integral_conversion!(to_u64, u64);

    fn to_i128(&self, n: Number, target: &str) -> MongoResult<i128> {
        match n {
            Number::Integer(v) => Ok(v),
            Number::Float(f) => {
                if !f.is_finite() {
                    return Err(overflow(n, target));
                }
                if f.fract() != 0.0 && !self.allow_truncation {
                    return Err(truncation(n, target));
                }
                let t = f.trunc();
                if t < i128::MIN as f64 || t >= i128::MAX as f64 {
                    return Err(overflow(n, target));
                }
                Ok(t as i128)
            }
            Number::Decimal(d) => {
                if !d.fract().is_zero() && !self.allow_truncation {
                    return Err(truncation(n, target));
                }
                d.trunc().to_i128().ok_or_else(|| overflow(n, target))
            }
        }
    }

    pub(crate) fn to_f64(&self, n: Number) -> MongoResult<f64> {
        match n {
            Number::Float(f) => Ok(f),
            Number::Integer(v) => {
                let f = v as f64;
                if !self.allow_truncation && f as i128 != v {
                    return Err(truncation(n, "f64"));
                }
                Ok(f)
            }
            Number::Decimal(d) => {
                let f = d.to_f64().ok_or_else(|| overflow(n, "f64"))?;
                if !self.allow_truncation && Decimal::try_from(f).ok() != Some(d.normalize()) {
                    return Err(truncation(n, "f64"));
                }
                Ok(f)
            }
        }
    }

    pub(crate) fn to_f32(&self, n: Number) -> MongoResult<f32> {
        let f = self.to_f64(n)?;
        if f.is_finite() && (f < f32::MIN as f64 || f > f32::MAX as f64) {
            if self.allow_overflow {
                return Ok(f as f32);
            }
            return Err(overflow(n, "f32"));
        }
        let narrowed = f as f32;
        if !self.allow_truncation && f64::from(narrowed) != f && !f.is_nan() {
            return Err(truncation(n, "f32"));
        }
        Ok(narrowed)
    }

    pub(crate) fn to_decimal(&self, n: Number) -> MongoResult<Decimal> {
        match n {
            Number::Decimal(d) => Ok(d),
            Number::Integer(v) => {
                Decimal::try_from_i128_with_scale(v, 0).map_err(|_| overflow(n, "Decimal"))
            }
            Number::Float(f) => {
                if !f.is_finite() {
                    return Err(overflow(n, "Decimal"));
                }
                let d = Decimal::try_from(f).map_err(|_| overflow(n, "Decimal"))?;
                if !self.allow_truncation && d.to_f64() != Some(f) {
                    return Err(truncation(n, "Decimal"));
                }
                Ok(d)
            }
        }
    }

    /// Convert a lifted number back into a value of the given numeric model type.
    pub(crate) fn to_value(&self, n: Number, ty: &TypeDescriptor) -> MongoResult<Value> {
        Ok(match ty {
            TypeDescriptor::I8 => Value::I8(self.to_i8(n)?),
            TypeDescriptor::U8 => Value::U8(self.to_u8(n)?),
            TypeDescriptor::I16 => Value::I16(self.to_i16(n)?),
            TypeDescriptor::U16 => Value::U16(self.to_u16(n)?),
            TypeDescriptor::I32 => Value::I32(self.to_i32(n)?),
            TypeDescriptor::U32 => Value::U32(self.to_u32(n)?),
            TypeDescriptor::I64 => Value::I64(self.to_i64(n)?),
            TypeDescriptor::U64 => Value::U64(self.to_u64(n)?),
            TypeDescriptor::F32 => Value::F32(self.to_f32(n)?),
            TypeDescriptor::F64 => Value::F64(self.to_f64(n)?),
            TypeDescriptor::Decimal => Value::Decimal(self.to_decimal(n)?),
            other => {
                return Err(MongoError::serialization(format!(
                    "`{other}` is not a numeric type"
                )));
            }
        })
    }

    /// Convert a lifted number to the given numeric wire type.
    pub(crate) fn to_bson(
        &self,
        n: Number,
        bson_type: bson::spec::ElementType,
    ) -> MongoResult<Bson> {
        use bson::spec::ElementType;
        Ok(match bson_type {
            ElementType::Int32 => Bson::Int32(self.to_i32(n)?),
            ElementType::Int64 => Bson::Int64(self.to_i64(n)?),
            ElementType::Double => Bson::Double(self.to_f64(n)?),
            ElementType::Decimal128 => Bson::Decimal128(decimal_to_decimal128(self.to_decimal(n)?)),
            ElementType::String => Bson::String(n.to_string()),
            other => {
                return Err(MongoError::serialization(format!(
                    "{other:?} is not a numeric wire type"
                )));
            }
        })
    }
}

fn overflow(n: Number, target: &str) -> MongoError {
    MongoError::serialization(format!("{n} overflows {target}"))
}

fn truncation(n: Number, target: &str) -> MongoError {
    MongoError::serialization(format!("{n} cannot be represented exactly as {target}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const STRICT: RepresentationConverter = RepresentationConverter {
        allow_overflow: false,
        allow_truncation: false,
    };

    #[test]
    fn test_integer_narrowing() {
        assert_eq!(STRICT.to_i32(Number::Integer(7)).unwrap(), 7);
        assert!(STRICT.to_i32(Number::Integer(i128::from(i64::MAX))).is_err());

        let lenient = RepresentationConverter::new(true, false);
        assert_eq!(lenient.to_i32(Number::Integer(1 << 32)).unwrap(), 0);
        assert_eq!(lenient.to_u8(Number::Integer(-1)).unwrap(), u8::MAX);
    }

    #[test]
    fn test_float_to_integer_truncation() {
        assert_eq!(STRICT.to_i64(Number::Float(3.0)).unwrap(), 3);
        assert!(STRICT.to_i64(Number::Float(3.5)).is_err());

        let lenient = RepresentationConverter::new(false, true);
        assert_eq!(lenient.to_i64(Number::Float(-3.5)).unwrap(), -3);
    }

    #[test]
    fn test_decimal_conversions() {
        let d = Decimal::from_str("12.50").unwrap();
        assert!(STRICT.to_i32(Number::Decimal(d)).is_err());
        assert_eq!(STRICT.to_f64(Number::Decimal(d)).unwrap(), 12.5);

        let third = Decimal::from_str("0.3333333333333333333333333333").unwrap();
        assert!(STRICT.to_f64(Number::Decimal(third)).is_err());
        assert!(
            RepresentationConverter::new(false, true)
                .to_f64(Number::Decimal(third))
                .is_ok()
        );
    }

    #[test]
    fn test_large_integer_to_double() {
        let exact = 1_i128 << 53;
        assert!(STRICT.to_f64(Number::Integer(exact)).is_ok());
        assert!(STRICT.to_f64(Number::Integer(exact + 1)).is_err());
    }

    #[test]
    fn test_to_bson_string() {
        let bson = STRICT
            .to_bson(Number::Integer(42), bson::spec::ElementType::String)
            .unwrap();
        assert_eq!(bson, Bson::String("42".into()));
    }

    #[test]
    fn test_parse_from_string() {
        let n = Number::from_bson(&Bson::String("42".into()), &TypeDescriptor::I32).unwrap();
        assert_eq!(n, Some(Number::Integer(42)));
        assert!(Number::from_bson(&Bson::String("x".into()), &TypeDescriptor::I32).is_err());
        assert_eq!(
            Number::from_bson(&Bson::Boolean(true), &TypeDescriptor::I32).unwrap(),
            None
        );
    }
}
