//! Text, binary and unique-identifier kinds.

use uuid::Uuid;

use super::{text_from, ValueKind};
use crate::error::ConversionError;
use crate::value::{SqlValue, StorageKind, ValueRef};

/// UTF-8 text.
#[derive(Debug, Default, Clone, Copy)]
pub struct Text;

impl ValueKind for Text {
    type Value = String;

    fn name(&self) -> &'static str {
        "text"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Text
    }

    fn encode(&self, value: &String) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Text(value.clone()))
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<String, ConversionError> {
        match value {
            ValueRef::Text(s) => Ok(s.to_owned()),
            ValueRef::Integer(n) => Ok(n.to_string()),
            ValueRef::Real(f) => Ok(f.to_string()),
            other => Err(ConversionError::Incompatible {
                target: "text",
                from: other.kind_name(),
            }),
        }
    }
}

/// Binary blob.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blob;

impl ValueKind for Blob {
    type Value = Vec<u8>;

    fn name(&self) -> &'static str {
        "blob"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Blob
    }

    fn encode(&self, value: &Vec<u8>) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Blob(value.clone()))
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<Vec<u8>, ConversionError> {
        match value {
            ValueRef::Blob(b) => Ok(b.to_vec()),
            ValueRef::Text(s) => Ok(s.as_bytes().to_vec()),
            other => Err(ConversionError::Incompatible {
                target: "blob",
                from: other.kind_name(),
            }),
        }
    }
}

/// UUID stored as its 16 raw bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKind;

impl ValueKind for UuidKind {
    type Value = Uuid;

    fn name(&self) -> &'static str {
        "uuid"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Blob
    }

    fn encode(&self, value: &Uuid) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Blob(value.as_bytes().to_vec()))
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<Uuid, ConversionError> {
        match value {
            ValueRef::Blob(b) => Uuid::from_slice(b).map_err(|_| ConversionError::OutOfRange {
                target: "uuid",
                value: format!("{} bytes", b.len()),
            }),
            other => {
                let s = text_from(other, "uuid")?;
                Uuid::parse_str(s.trim()).map_err(|_| ConversionError::Parse {
                    target: "uuid",
                    input: s.to_owned(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip_including_empty() {
        for s in ["", "héllo", "it's"] {
            let stored = Text.encode(&String::from(s)).unwrap();
            assert_eq!(Text.decode(stored.as_value_ref()).unwrap(), s);
        }
        assert_eq!(Text.decode(ValueRef::Integer(5)).unwrap(), "5");
        assert!(Text.decode(ValueRef::Blob(&[1])).is_err());
    }

    #[test]
    fn test_blob_round_trip_including_empty() {
        for b in [vec![], vec![0_u8, 255, 7]] {
            let stored = Blob.encode(&b).unwrap();
            assert_eq!(Blob.decode(stored.as_value_ref()).unwrap(), b);
        }
    }

    #[test]
    fn test_uuid_blob_and_text() {
        let id = Uuid::new_v4();
        let stored = UuidKind.encode(&id).unwrap();
        assert!(matches!(&stored, SqlValue::Blob(b) if b.len() == 16));
        assert_eq!(UuidKind.decode(stored.as_value_ref()).unwrap(), id);

        let text = id.hyphenated().to_string();
        assert_eq!(
            UuidKind.coerce(SqlValue::Text(text)).unwrap(),
            stored
        );
        assert!(UuidKind.decode(ValueRef::Blob(&[1, 2, 3])).is_err());
    }
}
