//! Semantic type descriptors.
//!
//! A descriptor converts between one semantic Rust value kind and one
//! storage class of the engine. [`ValueKind`] implements the conversion,
//! [`PersistentType`] adds per-instance nullability, and [`SqlType`] is the
//! type-erased view stored in seeds so parameters can be coerced without
//! knowing their Rust type.
//!
//! Binding accepts the declared kind or any representation the kind can
//! decode (for example an integral `REAL` or a numeric string for an integer
//! kind). Reading NULL through a non-nullable descriptor is always an error.

mod composite;
mod enums;
mod numeric;
mod temporal;
mod text;

use std::fmt;
use std::sync::Arc;

use crate::error::{ConversionError, Error, Result};
use crate::exec::Row;
use crate::value::{SqlValue, StorageKind, ValueRef};

pub use composite::{CompositeKind, OffsetTimestamp};
pub use enums::{EnumName, EnumOrdinal, SqlEnum};
pub use numeric::{Bool, DecimalKind, Float32, Float64, Int16, Int32, Int64, Int8, Numeric};
pub use temporal::{Date, DateTime, Time, Timestamp};
pub use text::{Blob, Text, UuidKind};

/// Conversion between one semantic kind and its storage representation.
pub trait ValueKind: fmt::Debug + Clone + Default + Send + Sync + 'static {
    /// The Rust value type.
    type Value: Clone + fmt::Debug + Send + Sync + 'static;

    /// Short name used in error messages.
    fn name(&self) -> &'static str;

    /// The storage class written by [`ValueKind::encode`].
    fn storage(&self) -> StorageKind;

    /// Declared column type used in DDL.
    fn declared_type(&self) -> &'static str {
        self.storage().as_sql()
    }

    /// Converts a value to its storage representation.
    fn encode(&self, value: &Self::Value) -> Result<SqlValue, ConversionError>;

    /// Converts a non-NULL storage value back to the semantic value.
    fn decode(&self, value: ValueRef<'_>) -> Result<Self::Value, ConversionError>;

    /// Coerces any compatible storage value to this kind's representation.
    fn coerce(&self, value: SqlValue) -> Result<SqlValue, ConversionError> {
        let decoded = self.decode(value.as_value_ref())?;
        self.encode(&decoded)
    }
}

/// A value kind plus the nullability of one column or parameter.
#[derive(Debug, Clone, Default)]
pub struct PersistentType<K: ValueKind> {
    kind: K,
    nullable: bool,
}

impl<K: ValueKind> PersistentType<K> {
    /// Creates a non-nullable descriptor.
    #[must_use]
    pub const fn new(kind: K) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// Creates a nullable descriptor.
    #[must_use]
    pub const fn nullable(kind: K) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }

    /// Returns a copy with the given nullability.
    #[must_use]
    pub fn with_nullable(&self, nullable: bool) -> Self {
        Self {
            kind: self.kind.clone(),
            nullable,
        }
    }

    /// Returns the value kind.
    #[must_use]
    pub const fn kind(&self) -> &K {
        &self.kind
    }

    /// Returns whether NULL is accepted.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Converts an optional value to its storage representation.
    pub fn bind_value(&self, value: Option<&K::Value>) -> Result<SqlValue, ConversionError> {
        match value {
            Some(v) => self.kind.encode(v),
            None if self.nullable => Ok(SqlValue::Null),
            None => Err(ConversionError::NullNotAllowed {
                target: self.kind.name(),
            }),
        }
    }

    /// Converts a storage value back to an optional semantic value.
    pub fn read(&self, value: ValueRef<'_>) -> Result<Option<K::Value>, ConversionError> {
        match value {
            ValueRef::Null if self.nullable => Ok(None),
            ValueRef::Null => Err(ConversionError::UnexpectedNull {
                target: self.kind.name(),
            }),
            other => self.kind.decode(other).map(Some),
        }
    }

    /// Reads the value at `index` of a result row.
    pub fn read_column(&self, row: &dyn Row, index: usize) -> Result<Option<K::Value>> {
        let value = row.value(index)?;
        self.read(value).map_err(Error::from)
    }
}

/// Type-erased descriptor view.
pub trait SqlType: fmt::Debug + Send + Sync {
    /// Short name used in error messages.
    fn type_name(&self) -> &'static str;

    /// Storage class.
    fn storage(&self) -> StorageKind;

    /// Declared column type used in DDL.
    fn declared_type(&self) -> &'static str;

    /// Whether NULL is accepted.
    fn is_nullable(&self) -> bool;

    /// Coerces a storage value, enforcing nullability.
    fn coerce(&self, value: SqlValue) -> Result<SqlValue, ConversionError>;

    /// Accepts a value this descriptor already encoded, checking only
    /// nullability. Scaled kinds would be scaled twice by
    /// [`SqlType::coerce`].
    fn accept_encoded(&self, value: SqlValue) -> Result<SqlValue, ConversionError>;
}

/// Shared erased descriptor.
pub type TypeRef = Arc<dyn SqlType>;

impl<K: ValueKind> SqlType for PersistentType<K> {
    fn type_name(&self) -> &'static str {
        self.kind.name()
    }

    fn storage(&self) -> StorageKind {
        self.kind.storage()
    }

    fn declared_type(&self) -> &'static str {
        self.kind.declared_type()
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }

    fn coerce(&self, value: SqlValue) -> Result<SqlValue, ConversionError> {
        if value.is_null() {
            return self.accept_encoded(value);
        }
        self.kind.coerce(value)
    }

    fn accept_encoded(&self, value: SqlValue) -> Result<SqlValue, ConversionError> {
        if value.is_null() && !self.nullable {
            return Err(ConversionError::NullNotAllowed {
                target: self.kind.name(),
            });
        }
        Ok(value)
    }
}

/// Reads an `i64` out of an integer, integral real or numeric text.
pub(crate) fn integer_from(value: ValueRef<'_>, target: &'static str) -> Result<i64, ConversionError> {
    match value {
        ValueRef::Integer(n) => Ok(n),
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        ValueRef::Real(f) => {
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(f as i64)
            } else {
                Err(ConversionError::OutOfRange {
                    target,
                    value: f.to_string(),
                })
            }
        }
        ValueRef::Text(s) => s.trim().parse::<i64>().map_err(|_| ConversionError::Parse {
            target,
            input: s.to_owned(),
        }),
        ValueRef::Null => Err(ConversionError::UnexpectedNull { target }),
        ValueRef::Blob(_) => Err(ConversionError::Incompatible {
            target,
            from: "BLOB",
        }),
    }
}

/// Reads an `f64` out of a real, integer or numeric text.
pub(crate) fn real_from(value: ValueRef<'_>, target: &'static str) -> Result<f64, ConversionError> {
    match value {
        ValueRef::Real(f) => Ok(f),
        #[allow(clippy::cast_precision_loss)]
        ValueRef::Integer(n) => Ok(n as f64),
        ValueRef::Text(s) => s.trim().parse::<f64>().map_err(|_| ConversionError::Parse {
            target,
            input: s.to_owned(),
        }),
        ValueRef::Null => Err(ConversionError::UnexpectedNull { target }),
        ValueRef::Blob(_) => Err(ConversionError::Incompatible {
            target,
            from: "BLOB",
        }),
    }
}

/// Reads text, rejecting the other storage classes.
pub(crate) fn text_from<'a>(value: ValueRef<'a>, target: &'static str) -> Result<&'a str, ConversionError> {
    match value {
        ValueRef::Text(s) => Ok(s),
        other => Err(ConversionError::Incompatible {
            target,
            from: other.kind_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_null_requires_nullable() {
        let strict = PersistentType::new(Int32);
        assert_eq!(
            strict.bind_value(None),
            Err(ConversionError::NullNotAllowed { target: "i32" })
        );
        let loose = PersistentType::nullable(Int32);
        assert_eq!(loose.bind_value(None), Ok(SqlValue::Null));
    }

    #[test]
    fn test_read_null_policy() {
        let strict = PersistentType::new(Text);
        assert_eq!(
            strict.read(ValueRef::Null),
            Err(ConversionError::UnexpectedNull { target: "text" })
        );
        let loose = strict.with_nullable(true);
        assert_eq!(loose.read(ValueRef::Null), Ok(None));
    }

    #[test]
    fn test_erased_coerce_checks_nullability() {
        let ty: TypeRef = Arc::new(PersistentType::new(Int64));
        assert!(ty.coerce(SqlValue::Null).is_err());
        assert_eq!(
            ty.coerce(SqlValue::Text(String::from(" 12 "))),
            Ok(SqlValue::Integer(12))
        );
        assert_eq!(ty.type_name(), "i64");
        assert_eq!(ty.declared_type(), "INTEGER");
    }

    #[test]
    fn test_encoded_values_are_not_rescaled() {
        let ty: TypeRef = Arc::new(PersistentType::new(DecimalKind::new(2)));
        assert_eq!(
            ty.accept_encoded(SqlValue::Integer(1234)),
            Ok(SqlValue::Integer(1234))
        );
        assert_eq!(ty.coerce(SqlValue::Integer(12)), Ok(SqlValue::Integer(1200)));
        assert!(ty.accept_encoded(SqlValue::Null).is_err());
    }

    #[test]
    fn test_integer_from_real() {
        assert_eq!(integer_from(ValueRef::Real(3.0), "i64"), Ok(3));
        assert!(integer_from(ValueRef::Real(3.5), "i64").is_err());
        assert!(integer_from(ValueRef::Real(f64::NAN), "i64").is_err());
    }
}
