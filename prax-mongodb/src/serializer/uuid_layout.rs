//! UUID byte layouts.

use bson::spec::BinarySubtype;
use bson::{Binary, Bson};
use uuid::Uuid;

use crate::config::UuidRepresentation;
use crate::document::wire_type_name;
use crate::error::{MongoError, MongoResult};

/// Reorder between RFC 4122 and .NET `Guid` byte order. The mapping is its own inverse.
fn csharp_order(bytes: [u8; 16]) -> [u8; 16] {
    let mut out = bytes;
    out[0..4].reverse();
    out[4..6].reverse();
    out[6..8].reverse();
    out
}

/// Reorder between RFC 4122 and the legacy Java driver order. The mapping is its own inverse.
fn java_order(bytes: [u8; 16]) -> [u8; 16] {
    let mut out = bytes;
    out[0..8].reverse();
    out[8..16].reverse();
    out
}

pub(crate) fn encode(uuid: &Uuid, representation: UuidRepresentation) -> Bson {
    let bytes = *uuid.as_bytes();
    let (subtype, bytes) = match representation {
        UuidRepresentation::Standard => (BinarySubtype::Uuid, bytes),
        UuidRepresentation::CsharpLegacy => (BinarySubtype::UuidOld, csharp_order(bytes)),
        UuidRepresentation::JavaLegacy => (BinarySubtype::UuidOld, java_order(bytes)),
        UuidRepresentation::PythonLegacy => (BinarySubtype::UuidOld, bytes),
        UuidRepresentation::String => return Bson::String(uuid.hyphenated().to_string()),
    };
    Bson::Binary(Binary {
        subtype,
        bytes: bytes.to_vec(),
    })
}

pub(crate) fn decode(bson: &Bson, representation: UuidRepresentation) -> MongoResult<Uuid> {
    match bson {
        Bson::String(s) => Uuid::parse_str(s)
            .map_err(|e| MongoError::serialization(format!("invalid UUID string: {e}"))),
        Bson::Binary(binary) => {
            let bytes: [u8; 16] = binary
                .bytes
                .as_slice()
                .try_into()
                .map_err(|_| MongoError::serialization("UUID binary must be 16 bytes"))?;
            let bytes = match (binary.subtype, representation) {
                (BinarySubtype::Uuid, _) => bytes,
                (BinarySubtype::UuidOld, UuidRepresentation::CsharpLegacy) => csharp_order(bytes),
                (BinarySubtype::UuidOld, UuidRepresentation::JavaLegacy) => java_order(bytes),
                (BinarySubtype::UuidOld, UuidRepresentation::PythonLegacy) => bytes,
                (subtype, _) => {
                    return Err(MongoError::serialization(format!(
                        "binary subtype {subtype:?} is not a UUID layout configured as \
                         {representation:?}"
                    )));
                }
            };
            Ok(Uuid::from_bytes(bytes))
        }
        other => Err(MongoError::serialization(format!(
            "cannot read {} as a UUID",
            wire_type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Uuid {
        Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap()
    }

    fn binary_bytes(bson: &Bson) -> (BinarySubtype, Vec<u8>) {
        match bson {
            Bson::Binary(b) => (b.subtype, b.bytes.clone()),
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_standard_layout() {
        let bson = encode(&sample(), UuidRepresentation::Standard);
        let (subtype, bytes) = binary_bytes(&bson);
        assert_eq!(subtype, BinarySubtype::Uuid);
        assert_eq!(bytes[0], 0x00);
        assert_eq!(bytes[15], 0xff);
        assert_eq!(decode(&bson, UuidRepresentation::Standard).unwrap(), sample());
    }

    #[test]
    fn test_csharp_legacy_layout() {
        let bson = encode(&sample(), UuidRepresentation::CsharpLegacy);
        let (subtype, bytes) = binary_bytes(&bson);
        assert_eq!(subtype, BinarySubtype::UuidOld);
        assert_eq!(
            bytes,
            vec![
                0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc,
                0xdd, 0xee, 0xff
            ]
        );
        assert_eq!(decode(&bson, UuidRepresentation::CsharpLegacy).unwrap(), sample());
    }

    #[test]
    fn test_java_legacy_layout() {
        let bson = encode(&sample(), UuidRepresentation::JavaLegacy);
        let (_, bytes) = binary_bytes(&bson);
        assert_eq!(&bytes[..8], &[0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00]);
        assert_eq!(decode(&bson, UuidRepresentation::JavaLegacy).unwrap(), sample());
    }

    #[test]
    fn test_string_layout() {
        let bson = encode(&sample(), UuidRepresentation::String);
        assert_eq!(bson, Bson::String("00112233-4455-6677-8899-aabbccddeeff".into()));
        assert_eq!(decode(&bson, UuidRepresentation::Standard).unwrap(), sample());
    }

    #[test]
    fn test_legacy_subtype_requires_legacy_configuration() {
        let bson = encode(&sample(), UuidRepresentation::PythonLegacy);
        assert!(decode(&bson, UuidRepresentation::Standard).is_err());
        assert!(decode(&Bson::Int32(1), UuidRepresentation::Standard).is_err());
    }
}
