//! IEEE 754-2008 decimal128 (binary integer decimal) encoding.

use bson::Decimal128;
use rust_decimal::Decimal;

use crate::error::{MongoError, MongoResult};

const EXPONENT_BIAS: i32 = 6176;
const COEFFICIENT_BITS: u32 = 113;
const COEFFICIENT_MASK: u128 = (1 << COEFFICIENT_BITS) - 1;
const EXPONENT_MASK: u128 = 0x3fff;
const MAX_COEFFICIENT: u128 = 9_999_999_999_999_999_999_999_999_999_999;
/// Largest coefficient a `Decimal` can hold (96 bits).
const MAX_DECIMAL_MANTISSA: u128 = (1 << 96) - 1;
const MAX_DECIMAL_SCALE: i32 = 28;

/// Encode a decimal. Every `Decimal` is exactly representable.
pub fn decimal_to_decimal128(value: Decimal) -> Decimal128 {
    let coefficient = value.mantissa().unsigned_abs();
    let exponent = (EXPONENT_BIAS - value.scale() as i32) as u128;
    let sign = u128::from(value.is_sign_negative());
    let bits = (sign << 127) | (exponent << COEFFICIENT_BITS) | coefficient;
    Decimal128::from_bytes(bits.to_le_bytes())
}

/// Decode a decimal128.
///
/// Fails for infinities, NaNs, non-canonical encodings and values that do not fit
/// in a `Decimal` without losing digits.
pub fn decimal_from_decimal128(value: &Decimal128) -> MongoResult<Decimal> {
    let bits = u128::from_le_bytes(value.bytes());
    let negative = bits >> 127 == 1;

    if (bits >> 125) & 0b11 == 0b11 {
        let reason = match (bits >> 122) & 0b1_1111 {
            0b1_1110 => "infinity",
            0b1_1111 => "NaN",
            _ => "a non-canonical coefficient",
        };
        return Err(MongoError::serialization(format!(
            "decimal128 value is {reason} and has no Decimal equivalent"
        )));
    }

    let exponent = ((bits >> COEFFICIENT_BITS) & EXPONENT_MASK) as i32 - EXPONENT_BIAS;
    let mut coefficient = bits & COEFFICIENT_MASK;
    if coefficient > MAX_COEFFICIENT {
        return Err(MongoError::serialization(
            "decimal128 value has a non-canonical coefficient",
        ));
    }

    let out_of_range = move || {
        MongoError::serialization(format!(
            "decimal128 value {}{coefficient}E{exponent} is outside the Decimal range",
            if negative { "-" } else { "" }
        ))
    };

    let mut scale = -exponent;
    if scale < 0 {
        let factor = 10u128
            .checked_pow(scale.unsigned_abs())
            .ok_or_else(out_of_range)?;
        coefficient = coefficient.checked_mul(factor).ok_or_else(out_of_range)?;
        scale = 0;
    }
    while (scale > MAX_DECIMAL_SCALE || coefficient > MAX_DECIMAL_MANTISSA)
        && scale > 0
        && coefficient % 10 == 0
    {
        coefficient /= 10;
        scale -= 1;
    }
    if scale > MAX_DECIMAL_SCALE || coefficient > MAX_DECIMAL_MANTISSA {
        return Err(out_of_range());
    }

    let mut decimal = Decimal::try_from_i128_with_scale(coefficient as i128, scale as u32)
        .map_err(|_| out_of_range())?;
    decimal.set_sign_negative(negative);
    Ok(decimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_encode_known_bits() {
        // 1 is coefficient 1 with biased exponent 6176 (0x3040 in the top 16 bits).
        let one = decimal_to_decimal128(Decimal::ONE);
        let bits = u128::from_le_bytes(one.bytes());
        assert_eq!(bits, (0x3040_u128 << 112) | 1);

        let neg = decimal_to_decimal128(Decimal::from_str("-1.5").unwrap());
        let bits = u128::from_le_bytes(neg.bytes());
        assert_eq!(bits >> 127, 1);
        assert_eq!(bits & COEFFICIENT_MASK, 15);
    }

    #[test]
    fn test_round_trip() {
        for s in [
            "0",
            "1",
            "-1.5",
            "123456.789",
            "79228162514264337593543950335",
            "0.0000000000000000000000000001",
        ] {
            let d = Decimal::from_str(s).unwrap();
            let decoded = decimal_from_decimal128(&decimal_to_decimal128(d)).unwrap();
            assert_eq!(decoded, d, "{s}");
            assert_eq!(decoded.scale(), d.scale(), "{s}");
        }
    }

    #[test]
    fn test_decode_positive_exponent() {
        // 5E+3
        let bits = ((EXPONENT_BIAS as u128 + 3) << COEFFICIENT_BITS) | 5;
        let d = decimal_from_decimal128(&Decimal128::from_bytes(bits.to_le_bytes())).unwrap();
        assert_eq!(d, Decimal::from(5000));
    }

    #[test]
    fn test_decode_trims_trailing_zeros() {
        // 1000E-30 is 1E-27
        let bits = ((EXPONENT_BIAS as u128 - 30) << COEFFICIENT_BITS) | 1000;
        let d = decimal_from_decimal128(&Decimal128::from_bytes(bits.to_le_bytes())).unwrap();
        assert_eq!(d, Decimal::from_str("0.000000000000000000000000001").unwrap());
    }

    #[test]
    fn test_decode_rejects_specials_and_out_of_range() {
        let infinity = 0b1_1110_u128 << 122;
        assert!(decimal_from_decimal128(&Decimal128::from_bytes(infinity.to_le_bytes())).is_err());

        let nan = 0b1_1111_u128 << 122;
        assert!(decimal_from_decimal128(&Decimal128::from_bytes(nan.to_le_bytes())).is_err());

        let huge = ((EXPONENT_BIAS as u128 + 40) << COEFFICIENT_BITS) | 1;
        assert!(decimal_from_decimal128(&Decimal128::from_bytes(huge.to_le_bytes())).is_err());

        let tiny = ((EXPONENT_BIAS as u128 - 40) << COEFFICIENT_BITS) | 1;
        assert!(decimal_from_decimal128(&Decimal128::from_bytes(tiny.to_le_bytes())).is_err());
    }
}
